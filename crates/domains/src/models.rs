//! # Domain Models
//!
//! These structs represent the core entities of the UpNest interaction
//! engine. Entity ids are UUID v4; all timestamps are UTC.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Alias to keep signatures honest about which Uuid identifies a user.
pub type UserId = Uuid;

/// The authorization category assigned to a logged-in user.
///
/// Anything the backend sends that we do not recognize deserializes to
/// `Guest`: permission checks must fail closed, never open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Teacher,
    Student,
    #[default]
    #[serde(other)]
    Guest,
}

impl Role {
    /// Parses a role name, degrading to `Guest` on unknown input.
    pub fn parse_or_guest(s: &str) -> Role {
        match s {
            "ADMIN" => Role::Admin,
            "TEACHER" => Role::Teacher,
            "STUDENT" => Role::Student,
            _ => Role::Guest,
        }
    }
}

/// One specific action type gated by the permission system.
/// Closed enumeration: unknown kinds never parse, so callers deny.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    CreatePost,
    EditPost,
    DeletePost,
    LikePost,
    CommentPost,
    EditComment,
    DeleteComment,
    SharePost,
    UploadMedia,
    PinPost,
    LockComments,
    ModerateComments,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 12] = [
        PermissionKind::CreatePost,
        PermissionKind::EditPost,
        PermissionKind::DeletePost,
        PermissionKind::LikePost,
        PermissionKind::CommentPost,
        PermissionKind::EditComment,
        PermissionKind::DeleteComment,
        PermissionKind::SharePost,
        PermissionKind::UploadMedia,
        PermissionKind::PinPost,
        PermissionKind::LockComments,
        PermissionKind::ModerateComments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::CreatePost => "create_post",
            PermissionKind::EditPost => "edit_post",
            PermissionKind::DeletePost => "delete_post",
            PermissionKind::LikePost => "like_post",
            PermissionKind::CommentPost => "comment_post",
            PermissionKind::EditComment => "edit_comment",
            PermissionKind::DeleteComment => "delete_comment",
            PermissionKind::SharePost => "share_post",
            PermissionKind::UploadMedia => "upload_media",
            PermissionKind::PinPost => "pin_post",
            PermissionKind::LockComments => "lock_comments",
            PermissionKind::ModerateComments => "moderate_comments",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown permission kind: {s}")))
    }
}

/// The reactions a post or comment can receive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    Like,
    Love,
    Haha,
    Wow,
    Sad,
    Angry,
    Clap,
    Thinking,
}

impl ReactionType {
    pub const ALL: [ReactionType; 8] = [
        ReactionType::Like,
        ReactionType::Love,
        ReactionType::Haha,
        ReactionType::Wow,
        ReactionType::Sad,
        ReactionType::Angry,
        ReactionType::Clap,
        ReactionType::Thinking,
    ];

    pub fn emoji(&self) -> &'static str {
        match self {
            ReactionType::Like => "👍",
            ReactionType::Love => "❤️",
            ReactionType::Haha => "😂",
            ReactionType::Wow => "😲",
            ReactionType::Sad => "😢",
            ReactionType::Angry => "😠",
            ReactionType::Clap => "👏",
            ReactionType::Thinking => "🤔",
        }
    }
}

/// The pending/approved/rejected lifecycle stage of content requiring
/// teacher review. `Pending` is the only state with outgoing transitions;
/// `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    /// Whether a moderation decision may still be applied.
    pub fn is_decidable(&self) -> bool {
        matches!(self, ModerationStatus::Pending)
    }
}

/// Per-request context attached to a permission check: who the resource
/// belongs to and which interaction switches are set on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceContext {
    pub author_id: Option<UserId>,
    pub owner_id: Option<UserId>,
    pub comments_locked: bool,
    pub interactions_disabled: bool,
}

impl ResourceContext {
    pub fn authored_by(author_id: UserId) -> Self {
        Self {
            author_id: Some(author_id),
            ..Default::default()
        }
    }

    pub fn owned_by(owner_id: UserId) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Default::default()
        }
    }

    pub fn with_comments_locked(mut self, locked: bool) -> Self {
        self.comments_locked = locked;
        self
    }

    pub fn with_interactions_disabled(mut self, disabled: bool) -> Self {
        self.interactions_disabled = disabled;
        self
    }
}

/// A media attachment reference, already uploaded and addressable by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: Uuid,
    pub url: String,
    pub name: String,
}

/// A post in a classroom group feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub group_id: Uuid,
    pub author_id: UserId,
    pub author_role: Role,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub comments_locked: bool,
    #[serde(default)]
    pub interactions_disabled: bool,
    #[serde(default)]
    pub status: ModerationStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub share_count: u32,
    /// Reaction buckets keyed by type; each bucket holds the ids of the
    /// users currently reacting with that type. A user appears in at most
    /// one bucket.
    #[serde(default)]
    pub reactions: BTreeMap<ReactionType, BTreeSet<UserId>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Sum over all reaction buckets.
    pub fn total_reactions(&self) -> usize {
        self.reactions.values().map(BTreeSet::len).sum()
    }

    /// The single reaction this user currently holds, if any.
    pub fn user_reaction(&self, user_id: UserId) -> Option<ReactionType> {
        self.reactions
            .iter()
            .find(|(_, users)| users.contains(&user_id))
            .map(|(kind, _)| *kind)
    }

    /// Replaces this user's reaction. `None` clears it. Empty buckets are
    /// pruned so counts never go negative and maps stay comparable.
    pub fn set_reaction(&mut self, user_id: UserId, reaction: Option<ReactionType>) {
        for users in self.reactions.values_mut() {
            users.remove(&user_id);
        }
        self.reactions.retain(|_, users| !users.is_empty());
        if let Some(kind) = reaction {
            self.reactions.entry(kind).or_default().insert(user_id);
        }
    }

    pub fn comment(&self, comment_id: Uuid) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn comment_mut(&mut self, comment_id: Uuid) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }

    /// The permission-check context this post presents to a caller.
    pub fn context(&self) -> ResourceContext {
        ResourceContext::authored_by(self.author_id)
            .with_comments_locked(self.comments_locked)
            .with_interactions_disabled(self.interactions_disabled)
    }
}

/// A comment under a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: UserId,
    pub author_role: Role,
    pub content: String,
    #[serde(default)]
    pub likes: BTreeSet<UserId>,
    #[serde(default)]
    pub replies: Vec<Reply>,
    #[serde(default)]
    pub status: ModerationStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub edited: bool,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Adds the user's like, or removes it if already present.
    pub fn toggle_like(&mut self, user_id: UserId) {
        if !self.likes.remove(&user_id) {
            self.likes.insert(user_id);
        }
    }

    pub fn reply_mut(&mut self, reply_id: Uuid) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| r.id == reply_id)
    }
}

/// A reply nested under a comment. Replies are not individually moderated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub author_id: UserId,
    pub content: String,
    #[serde(default)]
    pub likes: BTreeSet<UserId>,
    pub created_at: DateTime<Utc>,
}

/// The three conversation shapes the messaging surface supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// 1-1
    Personal,
    /// 1-N
    Group,
    /// 1-All within a classroom
    Classroom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub kind: ConversationKind,
    pub title: String,
    pub member_ids: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// Offset pagination for message history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_post(author: UserId) -> Post {
        Post {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            author_id: author,
            author_role: Role::Student,
            title: "Homework help".into(),
            content: "Can anyone check exercise 5?".into(),
            media: vec![],
            pinned: false,
            comments_locked: false,
            interactions_disabled: false,
            status: ModerationStatus::Approved,
            rejection_reason: None,
            share_count: 0,
            reactions: BTreeMap::new(),
            comments: vec![],
            created_at: Utc::now(),
            edited_at: None,
        }
    }

    #[test]
    fn unknown_role_deserializes_to_guest() {
        let role: Role = serde_json::from_str("\"SUPERUSER\"").unwrap();
        assert_eq!(role, Role::Guest);
        assert_eq!(Role::parse_or_guest("moderator"), Role::Guest);
        assert_eq!(Role::parse_or_guest("TEACHER"), Role::Teacher);
    }

    #[test]
    fn permission_kind_round_trips_and_rejects_unknown() {
        for kind in PermissionKind::ALL {
            assert_eq!(kind.as_str().parse::<PermissionKind>().unwrap(), kind);
        }
        assert!("ban_user".parse::<PermissionKind>().is_err());
    }

    #[test]
    fn reaction_buckets_hold_one_entry_per_user() {
        let user = Uuid::new_v4();
        let mut post = empty_post(Uuid::new_v4());

        post.set_reaction(user, Some(ReactionType::Like));
        assert_eq!(post.user_reaction(user), Some(ReactionType::Like));
        assert_eq!(post.total_reactions(), 1);

        // Switching type moves the user, total unchanged.
        post.set_reaction(user, Some(ReactionType::Love));
        assert_eq!(post.user_reaction(user), Some(ReactionType::Love));
        assert!(!post
            .reactions
            .get(&ReactionType::Like)
            .is_some_and(|b| b.contains(&user)));
        assert_eq!(post.total_reactions(), 1);

        // Clearing removes the bucket entirely.
        post.set_reaction(user, None);
        assert_eq!(post.user_reaction(user), None);
        assert_eq!(post.total_reactions(), 0);
        assert!(post.reactions.is_empty());
    }

    #[test]
    fn reaction_palette_round_trips_on_the_wire() {
        assert_eq!(ReactionType::ALL.len(), 8);
        let clap: ReactionType = serde_json::from_str("\"clap\"").unwrap();
        assert_eq!(clap, ReactionType::Clap);
        let thinking: ReactionType = serde_json::from_str("\"thinking\"").unwrap();
        assert_eq!(thinking, ReactionType::Thinking);
        assert_eq!(serde_json::to_string(&ReactionType::Wow).unwrap(), "\"wow\"");
    }

    #[test]
    fn moderation_status_is_decidable_only_while_pending() {
        assert!(ModerationStatus::Pending.is_decidable());
        assert!(!ModerationStatus::Approved.is_decidable());
        assert!(!ModerationStatus::Rejected.is_decidable());
    }
}
