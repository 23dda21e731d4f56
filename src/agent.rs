use chrono::{ DateTime, Duration, SecondsFormat, Utc };
use log::{ error, info };
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

use crate::config::prompt::{ build_generation_prompt, conversation_title, format_user_request };
use crate::llm::chat::ChatClient;
use crate::models::chat::{ ChatMessage, ConversationSummary, Role };
use crate::models::generate::{ GenerateResponse, PostBrief };
use crate::store::{ ConversationStore, StoreError };

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("content generation failed: {0}")]
    Generator(Box<dyn StdError + Send + Sync>),
}

/// Sequences the store and generator calls behind each route.
pub struct PostAgent {
    store: Arc<dyn ConversationStore>,
    chat_client: Arc<dyn ChatClient>,
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `now`, nudged forward so it sorts strictly after `prev` at millisecond precision.
fn strictly_after(prev: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = prev + Duration::milliseconds(1);
    if now < floor { floor } else { now }
}

impl PostAgent {
    pub fn new(store: Arc<dyn ConversationStore>, chat_client: Arc<dyn ChatClient>) -> Self {
        Self { store, chat_client }
    }

    pub async fn history(&self, uid: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        self.store.list_conversations(uid).await
    }

    pub async fn messages(&self, uid: &str, chat_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        self.store.list_messages(uid, chat_id).await
    }

    /// Records already written stay in place if a later step fails.
    pub async fn generate(
        &self,
        uid: &str,
        brief: &PostBrief
    ) -> Result<GenerateResponse, GenerateError> {
        let created_at = Utc::now();
        let title = conversation_title(&brief.topic);
        let chat_id = self.store.create_conversation(uid, &title, &iso(created_at)).await?;
        info!("Created conversation {} for user {}", chat_id, uid);

        let user_request = format_user_request(brief);
        let user_at = strictly_after(created_at, Utc::now());
        self.store.add_message(uid, &chat_id, Role::User, &user_request, &iso(user_at)).await?;

        let prompt = build_generation_prompt(brief);
        let completion = self.chat_client.complete(&prompt).await.map_err(|e| {
            error!(
                "Generator {} failed for conversation {}: {}",
                self.chat_client.get_model(),
                chat_id,
                e
            );
            GenerateError::Generator(e)
        })?;

        let model_at = strictly_after(user_at, Utc::now());
        self.store.add_message(
            uid,
            &chat_id,
            Role::Model,
            &completion.response,
            &iso(model_at)
        ).await?;

        Ok(GenerateResponse {
            chat_id,
            user_request,
            response: completion.response,
        })
    }
}
