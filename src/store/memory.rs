use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::chat::{ ChatMessage, ConversationSummary, Role };
use super::{ ConversationStore, StoreError };

#[derive(Default)]
struct UserData {
    // Insertion order is kept so equal timestamps list deterministically.
    chats: Vec<ConversationSummary>,
    messages: HashMap<String, Vec<ChatMessage>>,
}

/// Process-local store with the same layout as the Firestore one.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_conversation(
        &self,
        uid: &str,
        title: &str,
        created_at: &str
    ) -> Result<String, StoreError> {
        let id = Self::new_id();
        let mut users = self.users.write().await;
        users
            .entry(uid.to_string())
            .or_default()
            .chats.push(ConversationSummary {
                id: id.clone(),
                title: title.to_string(),
                created_at: created_at.to_string(),
            });
        Ok(id)
    }

    async fn add_message(
        &self,
        uid: &str,
        chat_id: &str,
        role: Role,
        text: &str,
        created_at: &str
    ) -> Result<String, StoreError> {
        let mut users = self.users.write().await;
        users
            .entry(uid.to_string())
            .or_default()
            .messages.entry(chat_id.to_string())
            .or_default()
            .push(ChatMessage {
                role,
                text: text.to_string(),
                created_at: created_at.to_string(),
            });
        Ok(Self::new_id())
    }

    async fn list_conversations(&self, uid: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let users = self.users.read().await;
        let mut chats: Vec<ConversationSummary> = users
            .get(uid)
            .map(|u| u.chats.iter().rev().cloned().collect())
            .unwrap_or_default();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats)
    }

    async fn list_messages(&self, uid: &str, chat_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let users = self.users.read().await;
        let mut messages = users
            .get(uid)
            .and_then(|u| u.messages.get(chat_id))
            .cloned()
            .unwrap_or_default();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }
}
