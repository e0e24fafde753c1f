//! # Core Traits (Ports)
//!
//! Any transport adapter must implement these traits to be used by the
//! services layer. `Err` means the transport itself failed (unreachable,
//! timed out); a delivered envelope with `success: false` means the
//! backend refused the operation.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::ApiResponse;
use crate::models::{
    Comment, Conversation, ConversationKind, MediaRef, Message, ModerationStatus, Page, Post,
    ReactionType, Reply, Role, UserId,
};

/// Request body for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub group_id: Uuid,
    pub author_id: UserId,
    pub author_role: Role,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaRef>,
}

/// Partial update for a post; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments_locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactions_disabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub author_id: UserId,
    pub author_role: Role,
    pub content: String,
    pub status: ModerationStatus,
    #[serde(default)]
    pub media: Vec<MediaRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReply {
    pub author_id: UserId,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConversation {
    pub title: String,
    pub member_ids: Vec<UserId>,
}

/// Persistence contract for the post/comment interaction surface.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait InteractionApi: Send + Sync {
    // Post operations
    async fn fetch_posts(&self, group_id: Uuid) -> anyhow::Result<ApiResponse<Vec<Post>>>;
    async fn fetch_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>>;
    async fn create_post(&self, new_post: NewPost) -> anyhow::Result<ApiResponse<Post>>;
    async fn update_post(
        &self,
        post_id: Uuid,
        patch: PostPatch,
    ) -> anyhow::Result<ApiResponse<Post>>;
    async fn delete_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<()>>;
    async fn share_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>>;

    // Reaction operations
    async fn set_reaction(
        &self,
        post_id: Uuid,
        user_id: UserId,
        reaction: Option<ReactionType>,
    ) -> anyhow::Result<ApiResponse<Post>>;

    // Comment operations
    async fn add_comment(
        &self,
        post_id: Uuid,
        comment: NewComment,
    ) -> anyhow::Result<ApiResponse<Comment>>;
    async fn update_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        content: String,
    ) -> anyhow::Result<ApiResponse<Comment>>;
    async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> anyhow::Result<ApiResponse<()>>;
    async fn toggle_comment_like(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        user_id: UserId,
    ) -> anyhow::Result<ApiResponse<Comment>>;
    async fn add_reply(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        reply: NewReply,
    ) -> anyhow::Result<ApiResponse<Reply>>;

    // Moderation operations
    async fn approve_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>>;
    async fn reject_post(
        &self,
        post_id: Uuid,
        reason: String,
    ) -> anyhow::Result<ApiResponse<Post>>;
    async fn approve_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> anyhow::Result<ApiResponse<Comment>>;
    async fn reject_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        reason: String,
    ) -> anyhow::Result<ApiResponse<Comment>>;
    async fn pending_posts(&self, group_id: Uuid) -> anyhow::Result<ApiResponse<Vec<Post>>>;
    async fn pending_comments(&self, group_id: Uuid)
        -> anyhow::Result<ApiResponse<Vec<Comment>>>;
}

/// Messaging contract: conversations and message history.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn get_conversations(&self) -> anyhow::Result<ApiResponse<Vec<Conversation>>>;
    async fn get_messages(
        &self,
        conversation_id: Uuid,
        page: Page,
    ) -> anyhow::Result<ApiResponse<Vec<Message>>>;
    async fn send_message(
        &self,
        conversation_id: Uuid,
        message: NewMessage,
    ) -> anyhow::Result<ApiResponse<Message>>;
    async fn create_conversation(
        &self,
        kind: ConversationKind,
        conversation: NewConversation,
    ) -> anyhow::Result<ApiResponse<Conversation>>;
}

/// Access-token storage contract. Keeps bearer tokens behind an interface
/// instead of reaching into global key-value storage.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<SecretString>;
    fn set(&self, token: SecretString);
    fn clear(&self);
}
