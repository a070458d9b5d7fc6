use crate::config::AppConfig;
use crate::storage::{FileStorage, StorageClient};
use crate::users::UserStore;
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<UserStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let storage = Arc::new(FileStorage::new(&config.data_dir)) as Arc<dyn StorageClient>;
        Self::from_parts(config, storage).await
    }

    /// Builds the state and prepares the users file.
    pub async fn from_parts(
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
    ) -> anyhow::Result<Self> {
        let users = Arc::new(UserStore::new(storage, config.users_file.clone()));
        users
            .initialize()
            .await
            .context("initialize user store")?;
        Ok(Self { config, users })
    }

    #[cfg(test)]
    pub async fn fake() -> Self {
        Self::fake_with(Arc::new(crate::storage::MemoryStorage::default())).await
    }

    #[cfg(test)]
    pub async fn fake_with(storage: Arc<crate::storage::MemoryStorage>) -> Self {
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            data_dir: "unused".into(),
            users_file: "users.json".into(),
            static_dir: "public".into(),
        });
        Self::from_parts(config, storage)
            .await
            .expect("in-memory store initializes")
    }
}
