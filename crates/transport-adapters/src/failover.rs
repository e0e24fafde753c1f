//! # Failover Transport
//!
//! Wraps a primary and a fallback transport; when the primary fails at the
//! transport level the call is retried against the fallback. A delivered
//! envelope with `success: false` is NOT a failover trigger — the backend
//! answered, it just refused.

use async_trait::async_trait;
use uuid::Uuid;

use domains::{
    ApiResponse, ChatApi, Comment, Conversation, ConversationKind, InteractionApi, Message,
    NewComment, NewConversation, NewMessage, NewPost, NewReply, Page, Post, PostPatch,
    ReactionType, Reply, UserId,
};

pub struct Failover<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> Failover<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

macro_rules! try_failover {
    ($self:ident . $method:ident ( $($arg:expr),* $(,)? )) => {{
        match $self.primary.$method($($arg.clone()),*).await {
            Ok(envelope) => Ok(envelope),
            Err(err) => {
                tracing::warn!(
                    call = stringify!($method),
                    error = %err,
                    "primary transport unreachable; using fallback"
                );
                $self.fallback.$method($($arg),*).await
            }
        }
    }};
}

#[async_trait]
impl<P: InteractionApi, F: InteractionApi> InteractionApi for Failover<P, F> {
    async fn fetch_posts(&self, group_id: Uuid) -> anyhow::Result<ApiResponse<Vec<Post>>> {
        try_failover!(self.fetch_posts(group_id))
    }

    async fn fetch_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>> {
        try_failover!(self.fetch_post(post_id))
    }

    async fn create_post(&self, new_post: NewPost) -> anyhow::Result<ApiResponse<Post>> {
        try_failover!(self.create_post(new_post))
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        patch: PostPatch,
    ) -> anyhow::Result<ApiResponse<Post>> {
        try_failover!(self.update_post(post_id, patch))
    }

    async fn delete_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<()>> {
        try_failover!(self.delete_post(post_id))
    }

    async fn share_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>> {
        try_failover!(self.share_post(post_id))
    }

    async fn set_reaction(
        &self,
        post_id: Uuid,
        user_id: UserId,
        reaction: Option<ReactionType>,
    ) -> anyhow::Result<ApiResponse<Post>> {
        try_failover!(self.set_reaction(post_id, user_id, reaction))
    }

    async fn add_comment(
        &self,
        post_id: Uuid,
        comment: NewComment,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        try_failover!(self.add_comment(post_id, comment))
    }

    async fn update_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        content: String,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        try_failover!(self.update_comment(post_id, comment_id, content))
    }

    async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> anyhow::Result<ApiResponse<()>> {
        try_failover!(self.delete_comment(post_id, comment_id))
    }

    async fn toggle_comment_like(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        user_id: UserId,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        try_failover!(self.toggle_comment_like(post_id, comment_id, user_id))
    }

    async fn add_reply(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        reply: NewReply,
    ) -> anyhow::Result<ApiResponse<Reply>> {
        try_failover!(self.add_reply(post_id, comment_id, reply))
    }

    async fn approve_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>> {
        try_failover!(self.approve_post(post_id))
    }

    async fn reject_post(
        &self,
        post_id: Uuid,
        reason: String,
    ) -> anyhow::Result<ApiResponse<Post>> {
        try_failover!(self.reject_post(post_id, reason))
    }

    async fn approve_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        try_failover!(self.approve_comment(post_id, comment_id))
    }

    async fn reject_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        reason: String,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        try_failover!(self.reject_comment(post_id, comment_id, reason))
    }

    async fn pending_posts(&self, group_id: Uuid) -> anyhow::Result<ApiResponse<Vec<Post>>> {
        try_failover!(self.pending_posts(group_id))
    }

    async fn pending_comments(
        &self,
        group_id: Uuid,
    ) -> anyhow::Result<ApiResponse<Vec<Comment>>> {
        try_failover!(self.pending_comments(group_id))
    }
}

#[async_trait]
impl<P: ChatApi, F: ChatApi> ChatApi for Failover<P, F> {
    async fn get_conversations(&self) -> anyhow::Result<ApiResponse<Vec<Conversation>>> {
        try_failover!(self.get_conversations())
    }

    async fn get_messages(
        &self,
        conversation_id: Uuid,
        page: Page,
    ) -> anyhow::Result<ApiResponse<Vec<Message>>> {
        try_failover!(self.get_messages(conversation_id, page))
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        message: NewMessage,
    ) -> anyhow::Result<ApiResponse<Message>> {
        try_failover!(self.send_message(conversation_id, message))
    }

    async fn create_conversation(
        &self,
        kind: ConversationKind,
        conversation: NewConversation,
    ) -> anyhow::Result<ApiResponse<Conversation>> {
        try_failover!(self.create_conversation(kind, conversation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    #[tokio::test]
    async fn offline_primary_falls_back() {
        let (primary, _) = MemoryTransport::seeded();
        let (fallback, seed) = MemoryTransport::seeded();
        primary.set_offline(true);

        let transport = Failover::new(primary, fallback);
        let envelope = transport.fetch_post(seed.teacher_post_id).await.unwrap();
        assert!(envelope.success);
    }

    #[tokio::test]
    async fn refusal_does_not_fail_over() {
        let (primary, _) = MemoryTransport::seeded();
        let (fallback, seed) = MemoryTransport::seeded();

        // The primary is reachable and answers "not found"; the fallback,
        // which does know the post, must not be consulted.
        let transport = Failover::new(primary, fallback);
        let envelope = transport.fetch_post(seed.teacher_post_id).await.unwrap();
        assert!(!envelope.success);
    }
}
