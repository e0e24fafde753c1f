//! The optimistic-update protocol under failure: the local change is
//! visible immediately, a transport failure surfaces an error, and the
//! subsequent authoritative reload discards the optimistic state.

use std::sync::Arc;

use domains::{AppError, InteractionApi, Role};
use services::{InteractionStore, PermissionChecker};
use transport_adapters::MemoryTransport;

#[tokio::test]
async fn failed_comment_is_discarded_on_reload() {
    let (transport, seed) = MemoryTransport::seeded();
    let transport = Arc::new(transport);

    let teacher = InteractionStore::new(
        PermissionChecker::new(Role::Teacher, Some(seed.teacher_id)),
        transport.clone() as Arc<dyn InteractionApi>,
    );
    // Start from a post with no comments at all.
    let post = teacher
        .create_post(
            seed.group_id,
            "Quiz answers".into(),
            "Posted after class.".into(),
            vec![],
        )
        .await
        .unwrap();
    assert!(post.comments.is_empty());

    let student = InteractionStore::new(
        PermissionChecker::new(Role::Student, Some(seed.student_id)),
        transport.clone() as Arc<dyn InteractionApi>,
    );
    student.load_feed(seed.group_id).await.unwrap();

    transport.set_offline(true);
    let err = student
        .add_comment(post.id, "Hello".into(), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Transport(_)));
    assert!(student.last_error().is_some());

    // The optimistic comment did not survive reconciliation.
    assert_eq!(student.post(post.id).unwrap().comments.len(), 0);

    // Once the backend is reachable again the authoritative state agrees.
    transport.set_offline(false);
    let reloaded = student.load_post(post.id).await.unwrap();
    assert_eq!(reloaded.comments.len(), 0);
    student.clear_error();
    assert!(student.last_error().is_none());
}

#[tokio::test]
async fn successful_mutation_prefers_the_server_entity() {
    let (transport, seed) = MemoryTransport::seeded();
    let transport = Arc::new(transport);
    let student = InteractionStore::new(
        PermissionChecker::new(Role::Student, Some(seed.student_id)),
        transport.clone() as Arc<dyn InteractionApi>,
    );
    student.load_feed(seed.group_id).await.unwrap();

    let comment = student
        .add_comment(seed.teacher_post_id, "Got it, thanks!".into(), vec![])
        .await
        .unwrap();

    // The id in the cache is the server's, and the server knows it too.
    let cached = student.post(seed.teacher_post_id).unwrap();
    assert!(cached.comments.iter().any(|c| c.id == comment.id));
    let authoritative = student.load_post(seed.teacher_post_id).await.unwrap();
    assert!(authoritative.comments.iter().any(|c| c.id == comment.id));
}

#[tokio::test]
async fn failed_delete_restores_the_post() {
    let (transport, seed) = MemoryTransport::seeded();
    let transport = Arc::new(transport);
    let teacher = InteractionStore::new(
        PermissionChecker::new(Role::Teacher, Some(seed.teacher_id)),
        transport.clone() as Arc<dyn InteractionApi>,
    );
    teacher.load_feed(seed.group_id).await.unwrap();

    transport.set_offline(true);
    let err = teacher.delete_post(seed.teacher_post_id).await.unwrap_err();
    assert!(matches!(err, AppError::Transport(_)));
    assert!(teacher.post(seed.teacher_post_id).is_some());
}
