//! # Interaction Store
//!
//! Per-post mutable state (reactions, comments, replies, pin/lock flags,
//! moderation status) updated optimistically: the local mutation is applied
//! first, then the remote call fires, and on failure the store reconciles
//! by reloading authoritative state. Every mutation is gated by the
//! [`PermissionChecker`] before any state change or network call happens.

use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use domains::{
    ApiResponse, AppError, Comment, InteractionApi, MediaRef, ModerationStatus, NewComment,
    NewPost, NewReply, Post, PostPatch, ReactionType, Reply, Result, UserId,
};

use crate::permissions::PermissionChecker;

/// Client-side state for one user session over a group feed.
///
/// Concurrent mutations to the same post are last-writer-wins by completion
/// order; no request sequencing is attempted.
pub struct InteractionStore {
    checker: PermissionChecker,
    api: Arc<dyn InteractionApi>,
    posts: DashMap<Uuid, Post>,
    last_error: Mutex<Option<String>>,
}

impl InteractionStore {
    pub fn new(checker: PermissionChecker, api: Arc<dyn InteractionApi>) -> Self {
        Self {
            checker,
            api,
            posts: DashMap::new(),
            last_error: Mutex::new(None),
        }
    }

    pub fn checker(&self) -> &PermissionChecker {
        &self.checker
    }

    /// A snapshot of the cached post, if loaded.
    pub fn post(&self, post_id: Uuid) -> Option<Post> {
        self.posts.get(&post_id).map(|p| p.clone())
    }

    /// Seeds the cache directly, e.g. with state handed over by a feed
    /// component that already fetched it.
    pub fn prime(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    /// The most recent operation failure surfaced to the user, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().expect("error slot poisoned").clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.lock().expect("error slot poisoned") = None;
    }

    // ── Loading ──────────────────────────────────────────────────────────

    /// Fetches the authoritative feed for a group and replaces the cache
    /// entries for every post it contains.
    pub async fn load_feed(&self, group_id: Uuid) -> Result<Vec<Post>> {
        let envelope = self.api.fetch_posts(group_id).await.map_err(transport)?;
        let posts = envelope.into_result()?;
        for post in &posts {
            self.posts.insert(post.id, post.clone());
        }
        debug!(group = %group_id, count = posts.len(), "feed loaded");
        Ok(posts)
    }

    /// Fetches one post, replacing whatever optimistic state was cached.
    pub async fn load_post(&self, post_id: Uuid) -> Result<Post> {
        let envelope = self.api.fetch_post(post_id).await.map_err(transport)?;
        let post = envelope.into_result()?;
        self.posts.insert(post.id, post.clone());
        Ok(post)
    }

    // ── Post operations ──────────────────────────────────────────────────

    pub async fn create_post(
        &self,
        group_id: Uuid,
        title: String,
        content: String,
        media: Vec<MediaRef>,
    ) -> Result<Post> {
        let ctx = Default::default();
        if !self.checker.can_perform(domains::PermissionKind::CreatePost, &ctx) {
            return Err(self.deny("creating posts"));
        }
        if content.trim().is_empty() && media.is_empty() {
            return Err(AppError::Validation("a post needs content or media".into()));
        }
        let author_id = self.author()?;
        let status = if self.checker.can_moderate() {
            ModerationStatus::Approved
        } else {
            ModerationStatus::Pending
        };

        let placeholder = Post {
            id: Uuid::new_v4(),
            group_id,
            author_id,
            author_role: self.checker.role(),
            title: title.clone(),
            content: content.clone(),
            media: media.clone(),
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
        let placeholder_id = placeholder.id;
        self.posts.insert(placeholder_id, placeholder);

        let request = NewPost {
            group_id,
            author_id,
            author_role: self.checker.role(),
            title,
            content,
            media,
        };
        match self.api.create_post(request).await {
            Ok(envelope) => match envelope.into_result() {
                Ok(server) => {
                    // Prefer the server's canonical id over the placeholder.
                    self.posts.remove(&placeholder_id);
                    self.posts.insert(server.id, server.clone());
                    self.clear_error();
                    Ok(server)
                }
                Err(err) => {
                    self.posts.remove(&placeholder_id);
                    self.record_error(&err.to_string());
                    Err(err)
                }
            },
            Err(err) => {
                // Nothing authoritative to reload for an entity that was
                // never created; just drop the optimistic one.
                self.posts.remove(&placeholder_id);
                let message = err.to_string();
                self.record_error(&message);
                Err(AppError::Transport(message))
            }
        }
    }

    pub async fn edit_post(
        &self,
        post_id: Uuid,
        title: Option<String>,
        content: Option<String>,
    ) -> Result<Post> {
        let current = self.cached(post_id)?;
        if !self
            .checker
            .can_perform(domains::PermissionKind::EditPost, &current.context())
        {
            return Err(self.deny("editing this post"));
        }
        if matches!(&content, Some(c) if c.trim().is_empty()) {
            return Err(AppError::Validation("post content may not be empty".into()));
        }
        let patch = PostPatch {
            title: title.clone(),
            content: content.clone(),
            ..Default::default()
        };
        self.mutate_post(
            post_id,
            |post| {
                if let Some(title) = title {
                    post.title = title;
                }
                if let Some(content) = content {
                    post.content = content;
                }
                post.edited_at = Some(Utc::now());
            },
            self.api.update_post(post_id, patch),
        )
        .await
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let snapshot = self.cached(post_id)?;
        if !self
            .checker
            .can_perform(domains::PermissionKind::DeletePost, &snapshot.context())
        {
            return Err(self.deny("deleting this post"));
        }
        self.posts.remove(&post_id);
        match self.api.delete_post(post_id).await {
            Ok(envelope) => match envelope.accepted() {
                Ok(()) => {
                    self.clear_error();
                    Ok(())
                }
                Err(err) => {
                    self.posts.insert(post_id, snapshot);
                    self.record_error(&err.to_string());
                    Err(err)
                }
            },
            Err(err) => Err(self.reconcile(post_id, snapshot, err).await),
        }
    }

    pub async fn share_post(&self, post_id: Uuid) -> Result<Post> {
        let current = self.cached(post_id)?;
        if !self
            .checker
            .can_perform(domains::PermissionKind::SharePost, &current.context())
        {
            return Err(self.deny("sharing posts"));
        }
        self.mutate_post(
            post_id,
            |post| post.share_count += 1,
            self.api.share_post(post_id),
        )
        .await
    }

    pub async fn set_pinned(&self, post_id: Uuid, pinned: bool) -> Result<Post> {
        self.cached(post_id)?;
        if !self.checker.can_pin_post() {
            return Err(self.deny("pinning posts"));
        }
        let patch = PostPatch {
            pinned: Some(pinned),
            ..Default::default()
        };
        self.mutate_post(
            post_id,
            |post| post.pinned = pinned,
            self.api.update_post(post_id, patch),
        )
        .await
    }

    pub async fn set_comments_locked(&self, post_id: Uuid, locked: bool) -> Result<Post> {
        self.cached(post_id)?;
        if !self.checker.can_lock_comments() {
            return Err(self.deny("locking comments"));
        }
        let patch = PostPatch {
            comments_locked: Some(locked),
            ..Default::default()
        };
        self.mutate_post(
            post_id,
            |post| post.comments_locked = locked,
            self.api.update_post(post_id, patch),
        )
        .await
    }

    pub async fn set_interactions_disabled(&self, post_id: Uuid, disabled: bool) -> Result<Post> {
        self.cached(post_id)?;
        if !self.checker.can_lock_comments() {
            return Err(self.deny("disabling interactions"));
        }
        let patch = PostPatch {
            interactions_disabled: Some(disabled),
            ..Default::default()
        };
        self.mutate_post(
            post_id,
            |post| post.interactions_disabled = disabled,
            self.api.update_post(post_id, patch),
        )
        .await
    }

    // ── Reactions ────────────────────────────────────────────────────────

    /// Selecting the reaction the user already holds removes it; selecting
    /// another replaces it. At most one reaction per user per post.
    pub async fn toggle_reaction(&self, post_id: Uuid, kind: ReactionType) -> Result<Post> {
        let current = self.cached(post_id)?;
        if !self.checker.can_like() || self.checker.is_interaction_disabled(&current.context()) {
            return Err(self.deny("reacting to this post"));
        }
        let user_id = self.author()?;
        let next = if current.user_reaction(user_id) == Some(kind) {
            None
        } else {
            Some(kind)
        };
        self.mutate_post(
            post_id,
            |post| post.set_reaction(user_id, next),
            self.api.set_reaction(post_id, user_id, next),
        )
        .await
    }

    // ── Comments ─────────────────────────────────────────────────────────

    pub async fn add_comment(
        &self,
        post_id: Uuid,
        content: String,
        media: Vec<MediaRef>,
    ) -> Result<Comment> {
        let current = self.cached(post_id)?;
        if !self.checker.can_comment(current.comments_locked)
            || self.checker.is_interaction_disabled(&current.context())
        {
            return Err(self.deny("commenting on this post"));
        }
        if content.trim().is_empty() && media.is_empty() {
            return Err(AppError::Validation("comment may not be empty".into()));
        }
        let author_id = self.author()?;
        let status = if self.checker.can_moderate() {
            ModerationStatus::Approved
        } else {
            ModerationStatus::Pending
        };

        let placeholder = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            author_role: self.checker.role(),
            content: content.clone(),
            likes: Default::default(),
            replies: vec![],
            status,
            rejection_reason: None,
            edited: false,
            created_at: Utc::now(),
        };
        let placeholder_id = placeholder.id;
        let request = NewComment {
            author_id,
            author_role: self.checker.role(),
            content,
            status,
            media,
        };
        self.mutate_comment(
            post_id,
            placeholder_id,
            |post| post.comments.insert(0, placeholder),
            self.api.add_comment(post_id, request),
        )
        .await
    }

    pub async fn edit_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        content: String,
    ) -> Result<Comment> {
        let current = self.cached(post_id)?;
        let comment = current
            .comment(comment_id)
            .ok_or_else(|| AppError::NotFound("Comment".into(), comment_id.to_string()))?;
        if !self.checker.can_edit_comment(comment.author_id) {
            return Err(self.deny("editing this comment"));
        }
        if content.trim().is_empty() {
            return Err(AppError::Validation("comment may not be empty".into()));
        }
        let body = content.clone();
        self.mutate_comment(
            post_id,
            comment_id,
            move |post| {
                if let Some(c) = post.comment_mut(comment_id) {
                    c.content = body;
                    c.edited = true;
                }
            },
            self.api.update_comment(post_id, comment_id, content),
        )
        .await
    }

    pub async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<()> {
        let snapshot = self.cached(post_id)?;
        let comment = snapshot
            .comment(comment_id)
            .ok_or_else(|| AppError::NotFound("Comment".into(), comment_id.to_string()))?;
        if !self.checker.can_delete_comment(comment.author_id) {
            return Err(self.deny("deleting this comment"));
        }
        let mut updated = snapshot.clone();
        updated.comments.retain(|c| c.id != comment_id);
        self.posts.insert(post_id, updated);

        match self.api.delete_comment(post_id, comment_id).await {
            Ok(envelope) => match envelope.accepted() {
                Ok(()) => {
                    self.clear_error();
                    Ok(())
                }
                Err(err) => {
                    self.posts.insert(post_id, snapshot);
                    self.record_error(&err.to_string());
                    Err(err)
                }
            },
            Err(err) => Err(self.reconcile(post_id, snapshot, err).await),
        }
    }

    pub async fn toggle_comment_like(&self, post_id: Uuid, comment_id: Uuid) -> Result<Comment> {
        let current = self.cached(post_id)?;
        if !self.checker.can_like() || self.checker.is_interaction_disabled(&current.context()) {
            return Err(self.deny("liking comments"));
        }
        current
            .comment(comment_id)
            .ok_or_else(|| AppError::NotFound("Comment".into(), comment_id.to_string()))?;
        let user_id = self.author()?;
        self.mutate_comment(
            post_id,
            comment_id,
            move |post| {
                if let Some(c) = post.comment_mut(comment_id) {
                    c.toggle_like(user_id);
                }
            },
            self.api.toggle_comment_like(post_id, comment_id, user_id),
        )
        .await
    }

    pub async fn add_reply(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        content: String,
    ) -> Result<Reply> {
        let current = self.cached(post_id)?;
        if !self.checker.can_comment(current.comments_locked)
            || self.checker.is_interaction_disabled(&current.context())
        {
            return Err(self.deny("replying on this post"));
        }
        current
            .comment(comment_id)
            .ok_or_else(|| AppError::NotFound("Comment".into(), comment_id.to_string()))?;
        if content.trim().is_empty() {
            return Err(AppError::Validation("reply may not be empty".into()));
        }
        let author_id = self.author()?;

        let placeholder = Reply {
            id: Uuid::new_v4(),
            author_id,
            content: content.clone(),
            likes: Default::default(),
            created_at: Utc::now(),
        };
        let placeholder_id = placeholder.id;

        let snapshot = current;
        let mut updated = snapshot.clone();
        if let Some(c) = updated.comment_mut(comment_id) {
            c.replies.insert(0, placeholder);
        }
        self.posts.insert(post_id, updated);

        let request = NewReply { author_id, content };
        match self.api.add_reply(post_id, comment_id, request).await {
            Ok(envelope) => match envelope.into_result() {
                Ok(server) => {
                    if let Some(mut post) = self.posts.get_mut(&post_id) {
                        if let Some(comment) = post.comment_mut(comment_id) {
                            match comment.replies.iter().position(|r| r.id == placeholder_id) {
                                Some(idx) => comment.replies[idx] = server.clone(),
                                None => comment.replies.insert(0, server.clone()),
                            }
                        }
                    }
                    self.clear_error();
                    Ok(server)
                }
                Err(err) => {
                    self.posts.insert(post_id, snapshot);
                    self.record_error(&err.to_string());
                    Err(err)
                }
            },
            Err(err) => Err(self.reconcile(post_id, snapshot, err).await),
        }
    }

    // ── Moderation ───────────────────────────────────────────────────────

    pub async fn approve_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Comment> {
        self.decidable_comment(post_id, comment_id)?;
        self.mutate_comment(
            post_id,
            comment_id,
            move |post| {
                if let Some(c) = post.comment_mut(comment_id) {
                    c.status = ModerationStatus::Approved;
                }
            },
            self.api.approve_comment(post_id, comment_id),
        )
        .await
    }

    pub async fn reject_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        reason: String,
    ) -> Result<Comment> {
        self.decidable_comment(post_id, comment_id)?;
        let stored_reason = reason.clone();
        self.mutate_comment(
            post_id,
            comment_id,
            move |post| {
                if let Some(c) = post.comment_mut(comment_id) {
                    c.status = ModerationStatus::Rejected;
                    c.rejection_reason = Some(stored_reason);
                }
            },
            self.api.reject_comment(post_id, comment_id, reason),
        )
        .await
    }

    pub async fn approve_post(&self, post_id: Uuid) -> Result<Post> {
        self.decidable_post(post_id)?;
        self.mutate_post(
            post_id,
            |post| post.status = ModerationStatus::Approved,
            self.api.approve_post(post_id),
        )
        .await
    }

    pub async fn reject_post(&self, post_id: Uuid, reason: String) -> Result<Post> {
        self.decidable_post(post_id)?;
        let stored_reason = reason.clone();
        self.mutate_post(
            post_id,
            |post| {
                post.status = ModerationStatus::Rejected;
                post.rejection_reason = Some(stored_reason);
            },
            self.api.reject_post(post_id, reason),
        )
        .await
    }

    pub async fn pending_posts(&self, group_id: Uuid) -> Result<Vec<Post>> {
        if !self.checker.can_moderate() {
            return Err(self.deny("viewing the moderation queue"));
        }
        let envelope = self.api.pending_posts(group_id).await.map_err(transport)?;
        envelope.into_result()
    }

    pub async fn pending_comments(&self, group_id: Uuid) -> Result<Vec<Comment>> {
        if !self.checker.can_moderate() {
            return Err(self.deny("viewing the moderation queue"));
        }
        let envelope = self
            .api
            .pending_comments(group_id)
            .await
            .map_err(transport)?;
        envelope.into_result()
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn author(&self) -> Result<UserId> {
        self.checker
            .user_id()
            .ok_or_else(|| AppError::Unauthorized("no signed-in user".into()))
    }

    fn deny(&self, what: &str) -> AppError {
        AppError::Unauthorized(format!(
            "{what} is not permitted for role {:?}",
            self.checker.role()
        ))
    }

    fn cached(&self, post_id: Uuid) -> Result<Post> {
        self.posts
            .get(&post_id)
            .map(|p| p.clone())
            .ok_or_else(|| AppError::NotFound("Post".into(), post_id.to_string()))
    }

    /// Moderation preconditions: the caller may moderate and the comment is
    /// still pending.
    fn decidable_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Comment> {
        if !self.checker.can_moderate() {
            return Err(self.deny("moderating comments"));
        }
        let post = self.cached(post_id)?;
        let comment = post
            .comment(comment_id)
            .ok_or_else(|| AppError::NotFound("Comment".into(), comment_id.to_string()))?;
        if !comment.status.is_decidable() {
            return Err(AppError::Conflict(format!(
                "comment {comment_id} already moderated"
            )));
        }
        Ok(comment.clone())
    }

    fn decidable_post(&self, post_id: Uuid) -> Result<Post> {
        if !self.checker.can_moderate() {
            return Err(self.deny("moderating posts"));
        }
        let post = self.cached(post_id)?;
        if !post.status.is_decidable() {
            return Err(AppError::Conflict(format!(
                "post {post_id} already moderated"
            )));
        }
        Ok(post)
    }

    fn record_error(&self, message: &str) {
        warn!(error = message, "interaction failed");
        *self.last_error.lock().expect("error slot poisoned") = Some(message.to_string());
    }

    /// Optimistic protocol for operations whose server answer is the whole
    /// post: snapshot, apply locally, call out, then prefer the server's
    /// entity on success, roll back on refusal, reload on transport loss.
    async fn mutate_post<F>(
        &self,
        post_id: Uuid,
        mutate: impl FnOnce(&mut Post),
        call: F,
    ) -> Result<Post>
    where
        F: Future<Output = anyhow::Result<ApiResponse<Post>>>,
    {
        let snapshot = self.cached(post_id)?;
        let mut updated = snapshot.clone();
        mutate(&mut updated);
        self.posts.insert(post_id, updated);

        match call.await {
            Ok(envelope) => match envelope.into_result() {
                Ok(server) => {
                    self.posts.insert(post_id, server.clone());
                    self.clear_error();
                    Ok(server)
                }
                Err(err) => {
                    self.posts.insert(post_id, snapshot);
                    self.record_error(&err.to_string());
                    Err(err)
                }
            },
            Err(err) => Err(self.reconcile(post_id, snapshot, err).await),
        }
    }

    /// Same protocol for operations whose server answer is one comment;
    /// the comment slot named by `target_id` is replaced with the server's
    /// version on success.
    async fn mutate_comment<F>(
        &self,
        post_id: Uuid,
        target_id: Uuid,
        mutate: impl FnOnce(&mut Post),
        call: F,
    ) -> Result<Comment>
    where
        F: Future<Output = anyhow::Result<ApiResponse<Comment>>>,
    {
        let snapshot = self.cached(post_id)?;
        let mut updated = snapshot.clone();
        mutate(&mut updated);
        self.posts.insert(post_id, updated);

        match call.await {
            Ok(envelope) => match envelope.into_result() {
                Ok(server) => {
                    if let Some(mut post) = self.posts.get_mut(&post_id) {
                        match post.comments.iter().position(|c| c.id == target_id) {
                            Some(idx) => post.comments[idx] = server.clone(),
                            None => post.comments.insert(0, server.clone()),
                        }
                    }
                    self.clear_error();
                    Ok(server)
                }
                Err(err) => {
                    self.posts.insert(post_id, snapshot);
                    self.record_error(&err.to_string());
                    Err(err)
                }
            },
            Err(err) => Err(self.reconcile(post_id, snapshot, err).await),
        }
    }

    /// Recovery after a transport-level failure: the optimistic change is
    /// discarded by reloading the authoritative post; if even the reload
    /// fails, the pre-mutation snapshot is restored.
    async fn reconcile(&self, post_id: Uuid, snapshot: Post, err: anyhow::Error) -> AppError {
        let message = err.to_string();
        self.record_error(&message);
        match self.api.fetch_post(post_id).await {
            Ok(envelope) => match envelope.into_result() {
                Ok(server) => {
                    self.posts.insert(post_id, server);
                }
                Err(_) => {
                    self.posts.insert(post_id, snapshot);
                }
            },
            Err(_) => {
                self.posts.insert(post_id, snapshot);
            }
        }
        AppError::Transport(message)
    }
}

fn transport(err: anyhow::Error) -> AppError {
    AppError::Transport(err.to_string())
}
