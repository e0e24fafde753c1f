//! # Role Permission Matrix & Checker
//!
//! A static grant table over (Role, PermissionKind) plus ownership
//! overrides. Checks are pure functions of (role, kind, context, user id)
//! and fail closed: anything absent or unparseable is a denial.

use std::collections::BTreeMap;

use domains::{PermissionKind, ResourceContext, Role, UserId};

/// The static grant table.
///
/// For Admin, Teacher, and Student, `false` does not mean "forbidden" —
/// it means "not globally granted"; ownership of the resource may still
/// grant the action (see [`PermissionChecker::can_perform`]). Guest is
/// outside the matrix entirely and never reaches the ownership fallback.
pub fn grants(role: Role, kind: PermissionKind) -> bool {
    use PermissionKind::*;
    match role {
        Role::Admin | Role::Teacher => true,
        Role::Student => matches!(
            kind,
            CreatePost | LikePost | CommentPost | SharePost | UploadMedia
        ),
        Role::Guest => false,
    }
}

/// Wraps the grant table with the caller's identity, producing allow/deny
/// decisions against a per-request [`ResourceContext`]. No side effects.
#[derive(Debug, Clone, Copy)]
pub struct PermissionChecker {
    role: Role,
    user_id: Option<UserId>,
}

impl PermissionChecker {
    pub fn new(role: Role, user_id: Option<UserId>) -> Self {
        Self { role, user_id }
    }

    /// An anonymous session: no identity, no grants.
    pub fn guest() -> Self {
        Self {
            role: Role::Guest,
            user_id: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// The core check: a `true` grant allows outright; a `false` grant
    /// still allows the owner of the resource. Guests have no row in the
    /// matrix at all — and every unrecognized role degrades to Guest — so
    /// they are denied before the ownership fallback is even consulted.
    pub fn can_perform(&self, kind: PermissionKind, context: &ResourceContext) -> bool {
        if self.role == Role::Guest {
            return false;
        }
        if grants(self.role, kind) {
            return true;
        }
        self.is_owner(context)
    }

    pub fn is_owner(&self, context: &ResourceContext) -> bool {
        match self.user_id {
            Some(me) => context.author_id == Some(me) || context.owner_id == Some(me),
            None => false,
        }
    }

    pub fn can_like(&self) -> bool {
        self.can_perform(PermissionKind::LikePost, &ResourceContext::default())
    }

    /// A comment lock overrides the base grant for everyone but teachers.
    pub fn can_comment(&self, comments_locked: bool) -> bool {
        if comments_locked && self.role != Role::Teacher {
            return false;
        }
        self.can_perform(PermissionKind::CommentPost, &ResourceContext::default())
    }

    /// Teachers may edit any comment; everyone else only their own.
    pub fn can_edit_comment(&self, comment_author_id: UserId) -> bool {
        if self.role == Role::Teacher {
            return true;
        }
        self.user_id == Some(comment_author_id)
    }

    /// Teachers may delete any comment; everyone else only their own.
    pub fn can_delete_comment(&self, comment_author_id: UserId) -> bool {
        if self.role == Role::Teacher {
            return true;
        }
        self.user_id == Some(comment_author_id)
    }

    pub fn can_upload_media(&self) -> bool {
        self.can_perform(PermissionKind::UploadMedia, &ResourceContext::default())
    }

    pub fn can_pin_post(&self) -> bool {
        self.can_perform(PermissionKind::PinPost, &ResourceContext::default())
    }

    pub fn can_lock_comments(&self) -> bool {
        self.can_perform(PermissionKind::LockComments, &ResourceContext::default())
    }

    pub fn can_moderate(&self) -> bool {
        self.can_perform(
            PermissionKind::ModerateComments,
            &ResourceContext::default(),
        )
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    /// Whether interactions on a resource are shut off for this caller.
    /// Teachers pass both the comment lock and the interaction switch.
    pub fn is_interaction_disabled(&self, context: &ResourceContext) -> bool {
        if context.comments_locked && self.role != Role::Teacher {
            return true;
        }
        if context.interactions_disabled {
            return !self.is_teacher();
        }
        false
    }

    /// The full grant row for this role, for UI affordance toggling.
    pub fn all_permissions(&self) -> BTreeMap<PermissionKind, bool> {
        PermissionKind::ALL
            .iter()
            .map(|&kind| (kind, grants(self.role, kind)))
            .collect()
    }
}

/// String-keyed convenience check. Unknown kinds deny.
pub fn has_permission(
    role: Role,
    kind: &str,
    context: &ResourceContext,
    user_id: Option<UserId>,
) -> bool {
    match kind.parse::<PermissionKind>() {
        Ok(kind) => PermissionChecker::new(role, user_id).can_perform(kind, context),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn guests_are_denied_everything() {
        let checker = PermissionChecker::guest();
        for kind in PermissionKind::ALL {
            assert!(
                !checker.can_perform(kind, &ResourceContext::default()),
                "guest unexpectedly allowed {kind}"
            );
        }
    }

    #[test]
    fn unknown_kinds_and_roles_fail_closed() {
        let me = Uuid::new_v4();
        let ctx = ResourceContext::authored_by(me);
        assert!(!has_permission(Role::Admin, "ban_user", &ctx, Some(me)));
        assert!(!has_permission(Role::Admin, "", &ctx, Some(me)));
        // An unrecognized role string degrades to Guest, which denies.
        let role = Role::parse_or_guest("PRINCIPAL");
        assert!(!has_permission(role, "like_post", &ctx, Some(me)));
    }

    #[test]
    fn ownership_never_rescues_guests_or_unknown_roles() {
        let me = Uuid::new_v4();
        let ctx = ResourceContext::authored_by(me);

        let guest = PermissionChecker::new(Role::Guest, Some(me));
        for kind in PermissionKind::ALL {
            assert!(
                !guest.can_perform(kind, &ctx),
                "ownership granted {kind} to a guest"
            );
        }

        let unknown = PermissionChecker::new(Role::parse_or_guest("PRINCIPAL"), Some(me));
        assert!(!unknown.can_perform(PermissionKind::LikePost, &ctx));
        assert!(!has_permission(
            Role::parse_or_guest("PRINCIPAL"),
            "like_post",
            &ctx,
            Some(me)
        ));
    }

    #[test]
    fn ownership_overrides_false_grant_for_students() {
        let me = Uuid::new_v4();
        let someone_else = Uuid::new_v4();
        let checker = PermissionChecker::new(Role::Student, Some(me));

        assert!(!grants(Role::Student, PermissionKind::EditComment));
        assert!(checker.can_perform(
            PermissionKind::EditComment,
            &ResourceContext::authored_by(me)
        ));
        assert!(!checker.can_perform(
            PermissionKind::EditComment,
            &ResourceContext::authored_by(someone_else)
        ));
        assert!(checker.can_edit_comment(me));
        assert!(!checker.can_edit_comment(someone_else));
        assert!(checker.can_delete_comment(me));
        assert!(!checker.can_delete_comment(someone_else));
    }

    #[test]
    fn owner_id_counts_as_ownership_too() {
        let me = Uuid::new_v4();
        let checker = PermissionChecker::new(Role::Student, Some(me));
        assert!(checker.can_perform(PermissionKind::DeletePost, &ResourceContext::owned_by(me)));
    }

    #[test]
    fn teachers_bypass_ownership_on_comments() {
        let teacher = PermissionChecker::new(Role::Teacher, Some(Uuid::new_v4()));
        let any_author = Uuid::new_v4();
        assert!(teacher.can_edit_comment(any_author));
        assert!(teacher.can_delete_comment(any_author));

        // Admins hold the grant but the derived helpers only bypass for
        // teachers; an admin edits someone else's comment via the grant.
        let admin = PermissionChecker::new(Role::Admin, Some(Uuid::new_v4()));
        assert!(!admin.can_edit_comment(any_author));
        assert!(admin.can_perform(
            PermissionKind::EditComment,
            &ResourceContext::authored_by(any_author)
        ));
    }

    #[test]
    fn comment_lock_overrides_grant_except_for_teachers() {
        let student = PermissionChecker::new(Role::Student, Some(Uuid::new_v4()));
        let teacher = PermissionChecker::new(Role::Teacher, Some(Uuid::new_v4()));

        assert!(student.can_comment(false));
        assert!(!student.can_comment(true));
        assert!(teacher.can_comment(true));
    }

    #[test]
    fn interaction_disable_spares_only_teachers() {
        let disabled = ResourceContext::default().with_interactions_disabled(true);
        let locked = ResourceContext::default().with_comments_locked(true);

        let student = PermissionChecker::new(Role::Student, Some(Uuid::new_v4()));
        let admin = PermissionChecker::new(Role::Admin, Some(Uuid::new_v4()));
        let teacher = PermissionChecker::new(Role::Teacher, Some(Uuid::new_v4()));

        assert!(student.is_interaction_disabled(&disabled));
        assert!(student.is_interaction_disabled(&locked));
        assert!(admin.is_interaction_disabled(&disabled));
        assert!(!teacher.is_interaction_disabled(&disabled));
        assert!(!teacher.is_interaction_disabled(&locked));
    }

    #[test]
    fn grant_row_matches_matrix() {
        let student = PermissionChecker::new(Role::Student, None);
        let row = student.all_permissions();
        assert_eq!(row.len(), PermissionKind::ALL.len());
        assert_eq!(row[&PermissionKind::CreatePost], true);
        assert_eq!(row[&PermissionKind::PinPost], false);
        assert_eq!(row[&PermissionKind::ModerateComments], false);
    }
}
