//! # Chat Service
//!
//! Thin wrapper over the [`ChatApi`] port: unwraps envelopes, validates
//! message bodies, and logs failures. Messaging carries no role gating —
//! conversation membership is enforced by the backend.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use domains::{
    AppError, ChatApi, Conversation, ConversationKind, Message, NewConversation, NewMessage,
    Page, Result, UserId,
};

pub struct ChatService {
    api: Arc<dyn ChatApi>,
}

impl ChatService {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self { api }
    }

    pub async fn conversations(&self) -> Result<Vec<Conversation>> {
        let envelope = self
            .api
            .get_conversations()
            .await
            .map_err(|e| transport("listing conversations", e))?;
        envelope.into_result()
    }

    pub async fn messages(&self, conversation_id: Uuid, page: Page) -> Result<Vec<Message>> {
        let envelope = self
            .api
            .get_messages(conversation_id, page)
            .await
            .map_err(|e| transport("loading messages", e))?;
        envelope.into_result()
    }

    pub async fn send(
        &self,
        conversation_id: Uuid,
        sender_id: UserId,
        body: String,
    ) -> Result<Message> {
        if body.trim().is_empty() {
            return Err(AppError::Validation("message may not be empty".into()));
        }
        let envelope = self
            .api
            .send_message(conversation_id, NewMessage { sender_id, body })
            .await
            .map_err(|e| transport("sending message", e))?;
        envelope.into_result()
    }

    pub async fn start(
        &self,
        kind: ConversationKind,
        title: String,
        member_ids: Vec<UserId>,
    ) -> Result<Conversation> {
        if member_ids.is_empty() {
            return Err(AppError::Validation(
                "a conversation needs at least one member".into(),
            ));
        }
        let envelope = self
            .api
            .create_conversation(kind, NewConversation { title, member_ids })
            .await
            .map_err(|e| transport("creating conversation", e))?;
        envelope.into_result()
    }
}

fn transport(what: &str, err: anyhow::Error) -> AppError {
    warn!(error = %err, "{what} failed");
    AppError::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::MockChatApi;

    #[tokio::test]
    async fn empty_message_is_rejected_without_a_call() {
        let api = Arc::new(MockChatApi::new());
        let chat = ChatService::new(api);
        let err = chat
            .send(Uuid::new_v4(), Uuid::new_v4(), "  \n".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
