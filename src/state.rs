// src/state.rs

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CONFIG;
use crate::llm::{
    AnthropicChatAdapter, ChatAdapter, ImageGenerationClient, OpenAiChatAdapter, ProviderKeys,
};
use crate::memory::MemoryStore;
use crate::storage::{ChatStore, FileStore, UserStore};
use crate::turn::TurnOrchestrator;

/// Shared application state: the stores, the orchestrator, and the file
/// storage settings handlers need.
pub struct AppState {
    pub pool: SqlitePool,
    pub chats: ChatStore,
    pub files: FileStore,
    pub users: UserStore,
    pub orchestrator: TurnOrchestrator,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Assemble the state from a connected pool using the process
    /// configuration for provider endpoints and default credentials.
    pub fn from_pool(pool: SqlitePool) -> Arc<Self> {
        let timeout = Duration::from_secs(CONFIG.provider_timeout_secs);

        let adapters: Vec<Arc<dyn ChatAdapter>> = vec![
            Arc::new(OpenAiChatAdapter::new(CONFIG.openai_base_url.clone(), timeout)),
            Arc::new(AnthropicChatAdapter::new(
                CONFIG.anthropic_base_url.clone(),
                timeout,
            )),
        ];
        let image_client = ImageGenerationClient::new(CONFIG.openai_base_url.clone(), timeout);

        let default_keys = ProviderKeys {
            openai: CONFIG.openai_api_key.clone(),
            anthropic: CONFIG.anthropic_api_key.clone(),
        };

        Self::assemble(
            pool,
            adapters,
            image_client,
            default_keys,
            CONFIG.upload_dir.clone(),
            CONFIG.max_upload_bytes,
            CONFIG.memory_context_limit,
        )
    }

    /// Explicit wiring; tests use this to point the adapters at a stub
    /// provider server and to control the default credentials.
    pub fn assemble(
        pool: SqlitePool,
        adapters: Vec<Arc<dyn ChatAdapter>>,
        image_client: ImageGenerationClient,
        default_keys: ProviderKeys,
        upload_dir: String,
        max_upload_bytes: usize,
        memory_context_limit: i64,
    ) -> Arc<Self> {
        let chats = ChatStore::new(pool.clone());
        let files = FileStore::new(pool.clone());
        let users = UserStore::new(pool.clone());
        let memories = MemoryStore::new(pool.clone());

        let orchestrator = TurnOrchestrator::new(
            chats.clone(),
            files.clone(),
            memories,
            adapters,
            image_client,
            default_keys,
            memory_context_limit,
        );

        Arc::new(AppState {
            pool,
            chats,
            files,
            users,
            orchestrator,
            upload_dir,
            max_upload_bytes,
        })
    }
}
