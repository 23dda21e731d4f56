pub mod agent;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod server;
pub mod store;

use agent::PostAgent;
use auth::{ FirebaseVerifier, IdentityVerifier };
use cli::Args;
use config::credentials::{
    load_service_account,
    resolve_project_id,
    ServiceAccountTokens,
    TokenSource,
    DATASTORE_SCOPE,
};
use llm::{ LlmConfig, LlmType };
use llm::chat::new_client as new_chat_client;
use log::info;
use server::{ AppState, Server };
use std::error::Error;
use std::sync::Arc;
use store::{ create_conversation_store, parse_store_type, FirestoreSettings };

/// Builds every collaborator once, then serves until the listener fails.
pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr());
    info!("TLS Enabled: {}", args.enable_tls);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Conversation Store Type: {}", args.store_type);
    info!("Service Account Key: {}", args.google_application_credentials);
    info!("-------------------------");

    let key = load_service_account(&args.google_application_credentials).await?;
    let project_id = resolve_project_id(args.firebase_project_id.as_deref(), key.as_ref())?;
    info!("Firebase project: {}", project_id);

    let verifier: Arc<dyn IdentityVerifier> = Arc::new(FirebaseVerifier::new(project_id.clone()));

    let tokens = key.map(|k| {
        Arc::new(ServiceAccountTokens::new(k, &[DATASTORE_SCOPE])) as Arc<dyn TokenSource>
    });
    let store = create_conversation_store(parse_store_type(&args.store_type)?, FirestoreSettings {
        base_url: args.firestore_base_url.clone(),
        project_id,
        database: args.firestore_database.clone(),
        tokens,
    })?;

    let chat_config = LlmConfig {
        llm_type: args.chat_llm_type.parse::<LlmType>()?,
        api_key: Some(args.gemini_api_key.clone()).filter(|k| !k.is_empty()),
        completion_model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
    };
    let chat_client = new_chat_client(&chat_config)?;
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={:?}",
        chat_config.llm_type,
        chat_client.get_model(),
        chat_client.get_base_url()
    );

    let agent = Arc::new(PostAgent::new(store, chat_client));
    let state = AppState::new(verifier, agent);
    Server::new(args, state).run().await
}
