//! # REST Transport
//!
//! `reqwest`-backed client for the real backend at `<base>/api/v1/...`.
//! Every endpoint answers the shared `{ success, data, message }` envelope;
//! a non-decodable body or an unreachable host is a transport-level error,
//! which the services layer treats as a reconciliation trigger.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use domains::{
    ApiResponse, ChatApi, Comment, Conversation, ConversationKind, InteractionApi, Message,
    NewComment, NewConversation, NewMessage, NewPost, NewReply, Page, Post, PostPatch,
    ReactionType, Reply, TokenStore, UserId,
};

pub struct RestTransport {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl RestTransport {
    /// `base_url` should include the API prefix, e.g.
    /// `http://localhost:8080/api/v1`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        tokens: Arc<dyn TokenStore>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = self.tokens.get() {
            request = request.bearer_auth(token.expose_secret());
        }
        request
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> anyhow::Result<ApiResponse<T>> {
        let response = request.send().await.context("request failed")?;
        response
            .json::<ApiResponse<T>>()
            .await
            .context("invalid response envelope")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<ApiResponse<T>> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<ApiResponse<T>> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    async fn put_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<ApiResponse<T>> {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<ApiResponse<T>> {
        self.send(self.request(Method::DELETE, path)).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReactionBody {
    user_id: UserId,
    reaction_type: ReactionType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LikeBody {
    user_id: UserId,
}

#[derive(Serialize)]
struct ContentBody {
    content: String,
}

#[derive(Serialize)]
struct ReasonBody {
    reason: String,
}

#[derive(Serialize)]
struct CreateConversationBody {
    #[serde(rename = "type")]
    kind: ConversationKind,
    #[serde(flatten)]
    conversation: NewConversation,
}

#[async_trait]
impl InteractionApi for RestTransport {
    async fn fetch_posts(&self, group_id: Uuid) -> anyhow::Result<ApiResponse<Vec<Post>>> {
        self.get(&format!("/posts?groupId={group_id}")).await
    }

    async fn fetch_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>> {
        self.get(&format!("/posts/{post_id}")).await
    }

    async fn create_post(&self, new_post: NewPost) -> anyhow::Result<ApiResponse<Post>> {
        self.post_json("/posts", &new_post).await
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        patch: PostPatch,
    ) -> anyhow::Result<ApiResponse<Post>> {
        self.put_json(&format!("/posts/{post_id}"), &patch).await
    }

    async fn delete_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<()>> {
        self.delete(&format!("/posts/{post_id}")).await
    }

    async fn share_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>> {
        self.post_json(&format!("/posts/{post_id}/share"), &()).await
    }

    async fn set_reaction(
        &self,
        post_id: Uuid,
        user_id: UserId,
        reaction: Option<ReactionType>,
    ) -> anyhow::Result<ApiResponse<Post>> {
        match reaction {
            Some(reaction_type) => {
                let body = ReactionBody {
                    user_id,
                    reaction_type,
                };
                self.post_json(&format!("/posts/{post_id}/reactions"), &body)
                    .await
            }
            None => self.delete(&format!("/posts/{post_id}/reactions")).await,
        }
    }

    async fn add_comment(
        &self,
        post_id: Uuid,
        comment: NewComment,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        self.post_json(&format!("/posts/{post_id}/comments"), &comment)
            .await
    }

    async fn update_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        content: String,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        self.put_json(
            &format!("/posts/{post_id}/comments/{comment_id}"),
            &ContentBody { content },
        )
        .await
    }

    async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> anyhow::Result<ApiResponse<()>> {
        self.delete(&format!("/posts/{post_id}/comments/{comment_id}"))
            .await
    }

    async fn toggle_comment_like(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        user_id: UserId,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        self.post_json(
            &format!("/posts/{post_id}/comments/{comment_id}/like"),
            &LikeBody { user_id },
        )
        .await
    }

    async fn add_reply(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        reply: NewReply,
    ) -> anyhow::Result<ApiResponse<Reply>> {
        self.post_json(
            &format!("/posts/{post_id}/comments/{comment_id}/replies"),
            &reply,
        )
        .await
    }

    async fn approve_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>> {
        self.post_json(&format!("/posts/{post_id}/approve"), &()).await
    }

    async fn reject_post(
        &self,
        post_id: Uuid,
        reason: String,
    ) -> anyhow::Result<ApiResponse<Post>> {
        self.post_json(&format!("/posts/{post_id}/reject"), &ReasonBody { reason })
            .await
    }

    async fn approve_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        self.post_json(
            &format!("/posts/{post_id}/comments/{comment_id}/approve"),
            &(),
        )
        .await
    }

    async fn reject_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        reason: String,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        self.post_json(
            &format!("/posts/{post_id}/comments/{comment_id}/reject"),
            &ReasonBody { reason },
        )
        .await
    }

    async fn pending_posts(&self, group_id: Uuid) -> anyhow::Result<ApiResponse<Vec<Post>>> {
        self.get(&format!("/posts/pending?groupId={group_id}")).await
    }

    async fn pending_comments(
        &self,
        group_id: Uuid,
    ) -> anyhow::Result<ApiResponse<Vec<Comment>>> {
        self.get(&format!("/comments/pending?groupId={group_id}"))
            .await
    }
}

#[async_trait]
impl ChatApi for RestTransport {
    async fn get_conversations(&self) -> anyhow::Result<ApiResponse<Vec<Conversation>>> {
        self.get("/chat/conversations").await
    }

    async fn get_messages(
        &self,
        conversation_id: Uuid,
        page: Page,
    ) -> anyhow::Result<ApiResponse<Vec<Message>>> {
        self.get(&format!(
            "/chat/conversations/{conversation_id}/messages?limit={}&offset={}",
            page.limit, page.offset
        ))
        .await
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        message: NewMessage,
    ) -> anyhow::Result<ApiResponse<Message>> {
        self.post_json(
            &format!("/chat/conversations/{conversation_id}/messages"),
            &message,
        )
        .await
    }

    async fn create_conversation(
        &self,
        kind: ConversationKind,
        conversation: NewConversation,
    ) -> anyhow::Result<ApiResponse<Conversation>> {
        self.post_json(
            "/chat/conversations",
            &CreateConversationBody { kind, conversation },
        )
        .await
    }
}
