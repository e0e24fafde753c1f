//! Comment and post moderation: pending content is decided exactly once,
//! decisions are terminal, and only moderators may drive them.

use std::sync::Arc;

use domains::{AppError, InteractionApi, ModerationStatus, Role};
use services::{InteractionStore, PermissionChecker};
use transport_adapters::{MemoryTransport, SeedData};

fn stores() -> (SeedData, InteractionStore, InteractionStore) {
    let (transport, seed) = MemoryTransport::seeded();
    let transport = Arc::new(transport);
    let student = InteractionStore::new(
        PermissionChecker::new(Role::Student, Some(seed.student_id)),
        transport.clone() as Arc<dyn InteractionApi>,
    );
    let teacher = InteractionStore::new(
        PermissionChecker::new(Role::Teacher, Some(seed.teacher_id)),
        transport as Arc<dyn InteractionApi>,
    );
    (seed, student, teacher)
}

#[tokio::test]
async fn reject_stores_the_reason_and_is_terminal() {
    let (seed, _, teacher) = stores();
    teacher.load_feed(seed.group_id).await.unwrap();

    let pending = teacher.pending_comments(seed.group_id).await.unwrap();
    assert_eq!(pending.len(), 1);
    let target = &pending[0];
    assert_eq!(target.status, ModerationStatus::Pending);

    let rejected = teacher
        .reject_comment(target.post_id, target.id, "off-topic".into())
        .await
        .unwrap();
    assert_eq!(rejected.status, ModerationStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("off-topic"));

    // A later approve attempt conflicts: rejected is terminal.
    let err = teacher
        .approve_comment(target.post_id, target.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // The queue drained.
    let pending = teacher.pending_comments(seed.group_id).await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn approving_a_pending_post_publishes_it() {
    let (seed, _, teacher) = stores();
    teacher.load_feed(seed.group_id).await.unwrap();

    assert_eq!(
        teacher.pending_posts(seed.group_id).await.unwrap().len(),
        1
    );
    let approved = teacher.approve_post(seed.pending_post_id).await.unwrap();
    assert_eq!(approved.status, ModerationStatus::Approved);
    assert!(teacher
        .pending_posts(seed.group_id)
        .await
        .unwrap()
        .is_empty());

    // Deciding twice conflicts.
    let err = teacher
        .reject_post(seed.pending_post_id, "late".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn students_may_neither_moderate_nor_see_the_queue() {
    let (seed, student, _) = stores();
    student.load_feed(seed.group_id).await.unwrap();

    let err = student.pending_comments(seed.group_id).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = student.approve_post(seed.pending_post_id).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn student_comments_queue_and_teacher_comments_do_not() {
    let (seed, student, teacher) = stores();
    student.load_feed(seed.group_id).await.unwrap();
    teacher.load_feed(seed.group_id).await.unwrap();

    let student_comment = student
        .add_comment(seed.teacher_post_id, "Is the lab graded?".into(), vec![])
        .await
        .unwrap();
    assert_eq!(student_comment.status, ModerationStatus::Pending);

    let teacher_comment = teacher
        .add_comment(seed.teacher_post_id, "Yes, see the rubric.".into(), vec![])
        .await
        .unwrap();
    assert_eq!(teacher_comment.status, ModerationStatus::Approved);
}
