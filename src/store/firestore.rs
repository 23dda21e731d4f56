use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::Client;
use serde::Deserialize;
use serde_json::{ json, Value as JsonValue };
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use crate::config::credentials::TokenSource;
use crate::models::chat::{ ChatMessage, ConversationSummary, Role };
use super::{ ConversationStore, StoreError };

const USERS: &str = "users";
const CHATS: &str = "chats";
const MESSAGES: &str = "messages";
const CREATED_AT: &str = "createdAt";
const DOCUMENT_NAME: &str = "__name__";

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValue {
    #[serde(default)]
    string_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryRow {
    #[serde(default)]
    document: Option<Document>,
}

impl Document {
    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    fn string(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.string_value.as_deref())
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        }
    }
}

/// Conversation store backed by the Cloud Firestore REST API.
pub struct FirestoreStore {
    http: Client,
    base_url: String,
    project_id: String,
    database: String,
    tokens: Arc<dyn TokenSource>,
}

impl FirestoreStore {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        database: impl Into<String>,
        tokens: Arc<dyn TokenSource>
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            project_id: project_id.into(),
            database: database.into(),
            tokens,
        }
    }

    /// `{base}/projects/{p}/databases/{db}/documents/{segments...}` with each segment escaped.
    fn documents_url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url).map_err(|e|
            StoreError::Malformed(format!("invalid Firestore base url '{}': {}", self.base_url, e))
        )?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Malformed(format!("Firestore base url '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["projects", self.project_id.as_str(), "databases", self.database.as_str(), "documents"])
            .extend(segments);
        Ok(url)
    }

    async fn create_document(
        &self,
        parent: &[&str],
        fields: &[(&str, &str)]
    ) -> Result<String, StoreError> {
        let url = self.documents_url(parent)?;
        let fields: serde_json::Map<String, JsonValue> = fields
            .iter()
            .map(|(name, value)| (name.to_string(), json!({ "stringValue": value })))
            .collect();

        debug!("Firestore createDocument {}", url.path());
        let token = self.tokens.access_token().await.map_err(|e| StoreError::Token(e.to_string()))?;
        let resp = self.http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "fields": fields }))
            .send().await?;
        let doc: Document = read_json(resp).await?;

        let id = doc.id();
        if id.is_empty() {
            return Err(StoreError::Malformed(format!("document name '{}' has no id", doc.name)));
        }
        Ok(id.to_string())
    }

    /// Runs a single-collection query under `parent`, ordered by `createdAt` then document name.
    async fn query_ordered(
        &self,
        parent: &[&str],
        collection: &str,
        direction: Direction
    ) -> Result<Vec<Document>, StoreError> {
        let (last, init) = parent
            .split_last()
            .ok_or_else(|| StoreError::Malformed("runQuery needs a parent document".into()))?;
        let mut segments: Vec<&str> = init.to_vec();
        let tail = format!("{}:runQuery", last);
        segments.push(&tail);
        let url = self.documents_url(&segments)?;

        let body =
            json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "orderBy": [
                    { "field": { "fieldPath": CREATED_AT }, "direction": direction.as_str() },
                    { "field": { "fieldPath": DOCUMENT_NAME }, "direction": direction.as_str() },
                ],
            }
        });

        debug!("Firestore runQuery {} on {}", collection, url.path());
        let token = self.tokens.access_token().await.map_err(|e| StoreError::Token(e.to_string()))?;
        let resp = self.http.post(url).bearer_auth(token).json(&body).send().await?;
        let rows: Vec<RunQueryRow> = read_json(resp).await?;

        Ok(rows.into_iter().filter_map(|row| row.document).collect())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, StoreError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(StoreError::Status { status: status.as_u16(), body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed(e.to_string()))
}

#[async_trait]
impl ConversationStore for FirestoreStore {
    async fn create_conversation(
        &self,
        uid: &str,
        title: &str,
        created_at: &str
    ) -> Result<String, StoreError> {
        self.create_document(
            &[USERS, uid, CHATS],
            &[
                ("title", title),
                (CREATED_AT, created_at),
            ]
        ).await
    }

    async fn add_message(
        &self,
        uid: &str,
        chat_id: &str,
        role: Role,
        text: &str,
        created_at: &str
    ) -> Result<String, StoreError> {
        self.create_document(
            &[USERS, uid, CHATS, chat_id, MESSAGES],
            &[
                ("role", role.as_str()),
                ("text", text),
                (CREATED_AT, created_at),
            ]
        ).await
    }

    async fn list_conversations(&self, uid: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let docs = self.query_ordered(&[USERS, uid], CHATS, Direction::Descending).await?;
        Ok(
            docs
                .iter()
                .map(|doc| ConversationSummary {
                    id: doc.id().to_string(),
                    title: doc.string("title").unwrap_or_default().to_string(),
                    created_at: doc.string(CREATED_AT).unwrap_or_default().to_string(),
                })
                .collect()
        )
    }

    async fn list_messages(&self, uid: &str, chat_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let docs = self.query_ordered(
            &[USERS, uid, CHATS, chat_id],
            MESSAGES,
            Direction::Ascending
        ).await?;

        let mut messages = Vec::with_capacity(docs.len());
        for doc in &docs {
            let Some(role) = doc.string("role").and_then(Role::parse) else {
                warn!("Skipping message {} with unknown role", doc.name);
                continue;
            };
            messages.push(ChatMessage {
                role,
                text: doc.string("text").unwrap_or_default().to_string(),
                created_at: doc.string(CREATED_AT).unwrap_or_default().to_string(),
            });
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::credentials::StaticToken;

    fn store(base: &str) -> FirestoreStore {
        FirestoreStore::new(base, "demo", "(default)", Arc::new(StaticToken::new("t")))
    }

    #[test]
    fn document_urls_escape_user_supplied_segments() {
        let url = store("https://firestore.googleapis.com/v1")
            .documents_url(&["users", "u 1", "chats", "a?b#c"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents/users/u%201/chats/a%3Fb%23c"
        );
    }

    #[test]
    fn document_id_is_last_name_segment() {
        let doc: Document = serde_json::from_value(
            json!({
            "name": "projects/demo/databases/(default)/documents/users/u/chats/abc123",
            "fields": { "title": { "stringValue": "Hello..." } }
        })
        ).unwrap();
        assert_eq!(doc.id(), "abc123");
        assert_eq!(doc.string("title"), Some("Hello..."));
        assert_eq!(doc.string("missing"), None);
    }
}
