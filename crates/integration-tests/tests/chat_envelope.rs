//! The messaging boundary: envelope contract, offset paging, and failover
//! to the mock transport when the primary is unreachable.

use std::sync::Arc;

use domains::{AppError, ChatApi, ConversationKind, Page};
use services::ChatService;
use transport_adapters::{Failover, MemoryTransport};
use uuid::Uuid;

#[tokio::test]
async fn conversations_and_messages_round_trip() {
    let (transport, seed) = MemoryTransport::seeded();
    let chat = ChatService::new(Arc::new(transport) as Arc<dyn ChatApi>);

    let conversations = chat.conversations().await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].kind, ConversationKind::Classroom);

    let sent = chat
        .send(seed.conversation_id, seed.student_id, "Here by 9?".into())
        .await
        .unwrap();
    assert_eq!(sent.sender_id, seed.student_id);

    let history = chat
        .messages(seed.conversation_id, Page::default())
        .await
        .unwrap();
    assert_eq!(history.last().unwrap().id, sent.id);
}

#[tokio::test]
async fn paging_slices_history_by_limit_and_offset() {
    let (transport, seed) = MemoryTransport::seeded();
    let chat = ChatService::new(Arc::new(transport) as Arc<dyn ChatApi>);

    for i in 0..4 {
        chat.send(seed.conversation_id, seed.student_id, format!("m{i}"))
            .await
            .unwrap();
    }
    // One seeded welcome message plus four sent above.
    let page = chat
        .messages(seed.conversation_id, Page { limit: 2, offset: 3 })
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].body, "m2");

    let past_the_end = chat
        .messages(seed.conversation_id, Page { limit: 10, offset: 50 })
        .await
        .unwrap();
    assert!(past_the_end.is_empty());
}

#[tokio::test]
async fn unknown_conversation_is_a_remote_refusal() {
    let (transport, seed) = MemoryTransport::seeded();
    let chat = ChatService::new(Arc::new(transport) as Arc<dyn ChatApi>);

    let err = chat
        .send(Uuid::new_v4(), seed.student_id, "anyone?".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Remote(m) if m == "Conversation not found"));
}

#[tokio::test]
async fn offline_primary_fails_over_to_the_mock() {
    let (primary, _) = MemoryTransport::seeded();
    primary.set_offline(true);
    let (fallback, seed) = MemoryTransport::seeded();

    let chat = ChatService::new(
        Arc::new(Failover::new(primary, fallback)) as Arc<dyn ChatApi>
    );

    let conversations = chat.conversations().await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].id, seed.conversation_id);

    let created = chat
        .start(
            ConversationKind::Group,
            "Project group".into(),
            vec![seed.student_id, seed.teacher_id],
        )
        .await
        .unwrap();
    assert_eq!(created.kind, ConversationKind::Group);
}
