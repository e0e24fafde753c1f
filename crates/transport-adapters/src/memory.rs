//! # In-memory Transport
//!
//! A dashmap-backed substitute for the real backend, honoring the exact
//! response envelope the services layer expects. Latency is simulated with
//! a sleep; `set_offline(true)` makes every call fail at the transport
//! level, which is how tests and demos exercise the reconciliation path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use domains::{
    ApiResponse, ChatApi, Comment, Conversation, ConversationKind, InteractionApi, Message,
    ModerationStatus, NewComment, NewConversation, NewMessage, NewPost, NewReply, Page, Post,
    PostPatch, ReactionType, Reply, Role, UserId,
};

/// Ids of the fixture entities created by [`MemoryTransport::seeded`].
#[derive(Debug, Clone, Copy)]
pub struct SeedData {
    pub group_id: Uuid,
    pub teacher_id: UserId,
    pub student_id: UserId,
    pub teacher_post_id: Uuid,
    pub pending_post_id: Uuid,
    pub conversation_id: Uuid,
}

#[derive(Default)]
pub struct MemoryTransport {
    posts: DashMap<Uuid, Post>,
    conversations: DashMap<Uuid, Conversation>,
    messages: DashMap<Uuid, Vec<Message>>,
    latency: Duration,
    offline: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    /// Simulates losing (or regaining) the backend.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn insert_post(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    pub fn insert_conversation(&self, conversation: Conversation) {
        self.messages.entry(conversation.id).or_default();
        self.conversations.insert(conversation.id, conversation);
    }

    /// A transport pre-populated with classroom fixtures, for demos and
    /// integration tests.
    pub fn seeded() -> (Self, SeedData) {
        let transport = Self::new();
        let group_id = Uuid::new_v4();
        let teacher_id = Uuid::new_v4();
        let student_id = Uuid::new_v4();
        let now = Utc::now();

        let teacher_post_id = Uuid::new_v4();
        let teacher_post = Post {
            id: teacher_post_id,
            group_id,
            author_id: teacher_id,
            author_role: Role::Teacher,
            title: "Week 12 reading".into(),
            content: "Finish chapter three and post one question below.".into(),
            media: vec![],
            pinned: true,
            comments_locked: false,
            interactions_disabled: false,
            status: ModerationStatus::Approved,
            rejection_reason: None,
            share_count: 0,
            reactions: Default::default(),
            comments: vec![Comment {
                id: Uuid::new_v4(),
                post_id: teacher_post_id,
                author_id: student_id,
                author_role: Role::Student,
                content: "Does the essay count toward the midterm?".into(),
                likes: Default::default(),
                replies: vec![],
                status: ModerationStatus::Pending,
                rejection_reason: None,
                edited: false,
                created_at: now,
            }],
            created_at: now,
            edited_at: None,
        };

        let pending_post = Post {
            id: Uuid::new_v4(),
            group_id,
            author_id: student_id,
            author_role: Role::Student,
            title: "Study group?".into(),
            content: "Anyone up for a call before the quiz?".into(),
            media: vec![],
            pinned: false,
            comments_locked: false,
            interactions_disabled: false,
            status: ModerationStatus::Pending,
            rejection_reason: None,
            share_count: 0,
            reactions: Default::default(),
            comments: vec![],
            created_at: now,
            edited_at: None,
        };
        let pending_post_id = pending_post.id;

        let conversation = Conversation {
            id: Uuid::new_v4(),
            kind: ConversationKind::Classroom,
            title: "English 10A".into(),
            member_ids: vec![teacher_id, student_id],
            created_at: now,
        };
        let conversation_id = conversation.id;

        transport.insert_post(teacher_post);
        transport.insert_post(pending_post);
        transport.insert_conversation(conversation);
        transport.messages.entry(conversation_id).or_default().push(Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: teacher_id,
            body: "Welcome to the class channel.".into(),
            sent_at: now,
        });

        (
            transport,
            SeedData {
                group_id,
                teacher_id,
                student_id,
                teacher_post_id,
                pending_post_id,
                conversation_id,
            },
        )
    }

    async fn simulate(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("backend unreachable (simulated)");
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(())
    }

    fn not_found(what: &str) -> String {
        format!("{what} not found")
    }
}

#[async_trait]
impl InteractionApi for MemoryTransport {
    async fn fetch_posts(&self, group_id: Uuid) -> anyhow::Result<ApiResponse<Vec<Post>>> {
        self.simulate().await?;
        let posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.group_id == group_id)
            .map(|p| p.clone())
            .collect();
        Ok(ApiResponse::ok(posts))
    }

    async fn fetch_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>> {
        self.simulate().await?;
        Ok(match self.posts.get(&post_id) {
            Some(post) => ApiResponse::ok(post.clone()),
            None => ApiResponse::failure(Self::not_found("Post")),
        })
    }

    async fn create_post(&self, new_post: NewPost) -> anyhow::Result<ApiResponse<Post>> {
        self.simulate().await?;
        // The backend decides moderation: staff posts go live immediately.
        let status = if matches!(new_post.author_role, Role::Teacher | Role::Admin) {
            ModerationStatus::Approved
        } else {
            ModerationStatus::Pending
        };
        let post = Post {
            id: Uuid::new_v4(),
            group_id: new_post.group_id,
            author_id: new_post.author_id,
            author_role: new_post.author_role,
            title: new_post.title,
            content: new_post.content,
            media: new_post.media,
            pinned: false,
            comments_locked: false,
            interactions_disabled: false,
            status,
            rejection_reason: None,
            share_count: 0,
            reactions: Default::default(),
            comments: vec![],
            created_at: Utc::now(),
            edited_at: None,
        };
        self.posts.insert(post.id, post.clone());
        debug!(post = %post.id, "post created");
        Ok(ApiResponse::ok_with(post, "Post created"))
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        patch: PostPatch,
    ) -> anyhow::Result<ApiResponse<Post>> {
        self.simulate().await?;
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Post")));
        };
        if let Some(title) = patch.title {
            post.title = title;
            post.edited_at = Some(Utc::now());
        }
        if let Some(content) = patch.content {
            post.content = content;
            post.edited_at = Some(Utc::now());
        }
        if let Some(pinned) = patch.pinned {
            post.pinned = pinned;
        }
        if let Some(locked) = patch.comments_locked {
            post.comments_locked = locked;
        }
        if let Some(disabled) = patch.interactions_disabled {
            post.interactions_disabled = disabled;
        }
        Ok(ApiResponse::ok(post.clone()))
    }

    async fn delete_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<()>> {
        self.simulate().await?;
        Ok(match self.posts.remove(&post_id) {
            Some(_) => ApiResponse::ok_with((), "Post deleted"),
            None => ApiResponse::failure(Self::not_found("Post")),
        })
    }

    async fn share_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>> {
        self.simulate().await?;
        Ok(match self.posts.get_mut(&post_id) {
            Some(mut post) => {
                post.share_count += 1;
                ApiResponse::ok(post.clone())
            }
            None => ApiResponse::failure(Self::not_found("Post")),
        })
    }

    async fn set_reaction(
        &self,
        post_id: Uuid,
        user_id: UserId,
        reaction: Option<ReactionType>,
    ) -> anyhow::Result<ApiResponse<Post>> {
        self.simulate().await?;
        Ok(match self.posts.get_mut(&post_id) {
            Some(mut post) => {
                post.set_reaction(user_id, reaction);
                ApiResponse::ok(post.clone())
            }
            None => ApiResponse::failure(Self::not_found("Post")),
        })
    }

    async fn add_comment(
        &self,
        post_id: Uuid,
        comment: NewComment,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        self.simulate().await?;
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Post")));
        };
        let stored = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id: comment.author_id,
            author_role: comment.author_role,
            content: comment.content,
            likes: Default::default(),
            replies: vec![],
            status: comment.status,
            rejection_reason: None,
            edited: false,
            created_at: Utc::now(),
        };
        post.comments.push(stored.clone());
        Ok(ApiResponse::ok_with(stored, "Comment added"))
    }

    async fn update_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        content: String,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        self.simulate().await?;
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Post")));
        };
        Ok(match post.comment_mut(comment_id) {
            Some(comment) => {
                comment.content = content;
                comment.edited = true;
                ApiResponse::ok(comment.clone())
            }
            None => ApiResponse::failure(Self::not_found("Comment")),
        })
    }

    async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> anyhow::Result<ApiResponse<()>> {
        self.simulate().await?;
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Post")));
        };
        let before = post.comments.len();
        post.comments.retain(|c| c.id != comment_id);
        Ok(if post.comments.len() < before {
            ApiResponse::ok_with((), "Comment deleted")
        } else {
            ApiResponse::failure(Self::not_found("Comment"))
        })
    }

    async fn toggle_comment_like(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        user_id: UserId,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        self.simulate().await?;
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Post")));
        };
        Ok(match post.comment_mut(comment_id) {
            Some(comment) => {
                comment.toggle_like(user_id);
                ApiResponse::ok(comment.clone())
            }
            None => ApiResponse::failure(Self::not_found("Comment")),
        })
    }

    async fn add_reply(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        reply: NewReply,
    ) -> anyhow::Result<ApiResponse<Reply>> {
        self.simulate().await?;
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Post")));
        };
        Ok(match post.comment_mut(comment_id) {
            Some(comment) => {
                let stored = Reply {
                    id: Uuid::new_v4(),
                    author_id: reply.author_id,
                    content: reply.content,
                    likes: Default::default(),
                    created_at: Utc::now(),
                };
                comment.replies.push(stored.clone());
                ApiResponse::ok(stored)
            }
            None => ApiResponse::failure(Self::not_found("Comment")),
        })
    }

    async fn approve_post(&self, post_id: Uuid) -> anyhow::Result<ApiResponse<Post>> {
        self.simulate().await?;
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Post")));
        };
        Ok(if post.status.is_decidable() {
            post.status = ModerationStatus::Approved;
            ApiResponse::ok_with(post.clone(), "Post approved")
        } else {
            ApiResponse::failure("Post already moderated")
        })
    }

    async fn reject_post(
        &self,
        post_id: Uuid,
        reason: String,
    ) -> anyhow::Result<ApiResponse<Post>> {
        self.simulate().await?;
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Post")));
        };
        Ok(if post.status.is_decidable() {
            post.status = ModerationStatus::Rejected;
            post.rejection_reason = Some(reason);
            ApiResponse::ok_with(post.clone(), "Post rejected")
        } else {
            ApiResponse::failure("Post already moderated")
        })
    }

    async fn approve_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        self.simulate().await?;
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Post")));
        };
        Ok(match post.comment_mut(comment_id) {
            Some(comment) if comment.status.is_decidable() => {
                comment.status = ModerationStatus::Approved;
                ApiResponse::ok_with(comment.clone(), "Comment approved")
            }
            Some(_) => ApiResponse::failure("Comment already moderated"),
            None => ApiResponse::failure(Self::not_found("Comment")),
        })
    }

    async fn reject_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        reason: String,
    ) -> anyhow::Result<ApiResponse<Comment>> {
        self.simulate().await?;
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Post")));
        };
        Ok(match post.comment_mut(comment_id) {
            Some(comment) if comment.status.is_decidable() => {
                comment.status = ModerationStatus::Rejected;
                comment.rejection_reason = Some(reason);
                ApiResponse::ok_with(comment.clone(), "Comment rejected")
            }
            Some(_) => ApiResponse::failure("Comment already moderated"),
            None => ApiResponse::failure(Self::not_found("Comment")),
        })
    }

    async fn pending_posts(&self, group_id: Uuid) -> anyhow::Result<ApiResponse<Vec<Post>>> {
        self.simulate().await?;
        let posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.group_id == group_id && p.status == ModerationStatus::Pending)
            .map(|p| p.clone())
            .collect();
        Ok(ApiResponse::ok(posts))
    }

    async fn pending_comments(
        &self,
        group_id: Uuid,
    ) -> anyhow::Result<ApiResponse<Vec<Comment>>> {
        self.simulate().await?;
        let comments: Vec<Comment> = self
            .posts
            .iter()
            .filter(|p| p.group_id == group_id)
            .flat_map(|p| {
                p.comments
                    .iter()
                    .filter(|c| c.status == ModerationStatus::Pending)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(ApiResponse::ok(comments))
    }
}

#[async_trait]
impl ChatApi for MemoryTransport {
    async fn get_conversations(&self) -> anyhow::Result<ApiResponse<Vec<Conversation>>> {
        self.simulate().await?;
        let mut conversations: Vec<Conversation> =
            self.conversations.iter().map(|c| c.clone()).collect();
        conversations.sort_by_key(|c| c.created_at);
        Ok(ApiResponse::ok(conversations))
    }

    async fn get_messages(
        &self,
        conversation_id: Uuid,
        page: Page,
    ) -> anyhow::Result<ApiResponse<Vec<Message>>> {
        self.simulate().await?;
        let Some(messages) = self.messages.get(&conversation_id) else {
            return Ok(ApiResponse::failure(Self::not_found("Conversation")));
        };
        let slice: Vec<Message> = messages
            .iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect();
        Ok(ApiResponse::ok(slice))
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        message: NewMessage,
    ) -> anyhow::Result<ApiResponse<Message>> {
        self.simulate().await?;
        if !self.conversations.contains_key(&conversation_id) {
            return Ok(ApiResponse::failure(Self::not_found("Conversation")));
        }
        let stored = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: message.sender_id,
            body: message.body,
            sent_at: Utc::now(),
        };
        self.messages
            .entry(conversation_id)
            .or_default()
            .push(stored.clone());
        Ok(ApiResponse::ok_with(stored, "Message sent"))
    }

    async fn create_conversation(
        &self,
        kind: ConversationKind,
        conversation: NewConversation,
    ) -> anyhow::Result<ApiResponse<Conversation>> {
        self.simulate().await?;
        let stored = Conversation {
            id: Uuid::new_v4(),
            kind,
            title: conversation.title,
            member_ids: conversation.member_ids,
            created_at: Utc::now(),
        };
        self.insert_conversation(stored.clone());
        Ok(ApiResponse::ok_with(stored, "Conversation created"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_transport_fails_at_the_transport_level() {
        let (transport, seed) = MemoryTransport::seeded();
        transport.set_offline(true);
        assert!(transport.fetch_post(seed.teacher_post_id).await.is_err());

        transport.set_offline(false);
        let envelope = transport.fetch_post(seed.teacher_post_id).await.unwrap();
        assert!(envelope.success);
    }

    #[tokio::test]
    async fn missing_entities_refuse_inside_the_envelope() {
        let transport = MemoryTransport::new();
        let envelope = transport.fetch_post(Uuid::new_v4()).await.unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("Post not found"));
    }

    #[tokio::test]
    async fn message_history_pages_by_limit_and_offset() {
        let (transport, seed) = MemoryTransport::seeded();
        for i in 0..5 {
            transport
                .send_message(
                    seed.conversation_id,
                    NewMessage {
                        sender_id: seed.student_id,
                        body: format!("message {i}"),
                    },
                )
                .await
                .unwrap();
        }
        let page = transport
            .get_messages(seed.conversation_id, Page { limit: 3, offset: 1 })
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].body, "message 0");
    }

    #[tokio::test]
    async fn moderation_decisions_are_terminal() {
        let (transport, seed) = MemoryTransport::seeded();
        let rejected = transport
            .reject_post(seed.pending_post_id, "duplicate".into())
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(rejected.status, ModerationStatus::Rejected);

        let second = transport.approve_post(seed.pending_post_id).await.unwrap();
        assert!(!second.success);
    }
}
