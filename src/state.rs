use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, CategoryService, PasswordHasher, SeaOrmAuthService, SeaOrmCategoryService,
    SeaOrmUserService, TokenIssuer, UploadStore, UserService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: Arc<TokenIssuer>,

    pub uploads: Arc<UploadStore>,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub category_service: Arc<dyn CategoryService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store)
    }

    /// Wires the services around an already-migrated store.
    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(&config.security)?;
        let tokens = Arc::new(TokenIssuer::new(&config.security));
        let uploads = Arc::new(UploadStore::new(&config.uploads));

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            hasher.clone(),
            tokens.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let user_service = Arc::new(SeaOrmUserService::new(store.clone(), hasher))
            as Arc<dyn UserService + Send + Sync + 'static>;

        let category_service = Arc::new(SeaOrmCategoryService::new(
            store.clone(),
            uploads.clone(),
        )) as Arc<dyn CategoryService + Send + Sync + 'static>;

        Ok(Self {
            config: Arc::new(config),
            store,
            tokens,
            uploads,
            auth_service,
            user_service,
            category_service,
        })
    }
}
