pub mod firestore;
pub mod memory;

use async_trait::async_trait;
use log::info;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

use crate::config::credentials::TokenSource;
use crate::models::chat::{ ChatMessage, ConversationSummary, Role };

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },

    #[error("malformed store response: {0}")]
    Malformed(String),

    #[error("could not obtain store access token: {0}")]
    Token(String),
}

/// Conversations live under the owning user; messages under their conversation.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Creates a conversation and returns its generated id.
    async fn create_conversation(
        &self,
        uid: &str,
        title: &str,
        created_at: &str
    ) -> Result<String, StoreError>;

    /// Appends a message to a conversation and returns the message id.
    async fn add_message(
        &self,
        uid: &str,
        chat_id: &str,
        role: Role,
        text: &str,
        created_at: &str
    ) -> Result<String, StoreError>;

    /// Newest first. Equal `createdAt` values fall back to a store-specific
    /// but stable order: document name in Firestore, latest insert in memory.
    async fn list_conversations(&self, uid: &str) -> Result<Vec<ConversationSummary>, StoreError>;

    /// Oldest first. An unknown `chat_id` yields an empty list.
    async fn list_messages(&self, uid: &str, chat_id: &str) -> Result<Vec<ChatMessage>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    Firestore,
    Memory,
}

pub fn parse_store_type(type_str: &str) -> Result<StoreType, String> {
    match type_str.to_lowercase().as_str() {
        "firestore" => Ok(StoreType::Firestore),
        "memory" => Ok(StoreType::Memory),
        _ => Err(format!("Unsupported conversation store type: {}", type_str)),
    }
}

pub struct FirestoreSettings {
    pub base_url: String,
    pub project_id: String,
    pub database: String,
    pub tokens: Option<Arc<dyn TokenSource>>,
}

pub fn create_conversation_store(
    store_type: StoreType,
    settings: FirestoreSettings
) -> Result<Arc<dyn ConversationStore>, Box<dyn StdError + Send + Sync>> {
    match store_type {
        StoreType::Firestore => {
            let tokens = settings.tokens.ok_or(
                "Firestore store requires service account credentials (GOOGLE_APPLICATION_CREDENTIALS)"
            )?;
            info!(
                "Conversations will be stored in Firestore project '{}' database '{}'",
                settings.project_id,
                settings.database
            );
            let store = FirestoreStore::new(
                settings.base_url,
                settings.project_id,
                settings.database,
                tokens
            );
            Ok(Arc::new(store))
        }
        StoreType::Memory => {
            info!("Conversations will be stored in process memory and lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
