use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{
    jwt::JwtKeys,
    password::PasswordHasher,
    repo::{PgUserRepo, UserRepo},
    services::CredentialStore,
};
use crate::config::AppConfig;
use crate::db;
use crate::debts::{
    repo::{DebtRepo, PgDebtRepo},
    services::DebtLedger,
};

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: Arc<JwtKeys>,
    pub credentials: CredentialStore,
    pub debts: DebtLedger,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;

        Self::from_parts(
            config,
            Arc::new(PgUserRepo::new(pool.clone())),
            Arc::new(PgDebtRepo::new(pool)),
        )
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserRepo>,
        debts: Arc<dyn DebtRepo>,
    ) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(&config.password)?;
        let keys = Arc::new(JwtKeys::from_config(&config.jwt));
        Ok(Self {
            config: Arc::new(config),
            keys,
            credentials: CredentialStore::new(users, hasher)?,
            debts: DebtLedger::new(debts),
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::memory::MemoryStore;

        let store = Arc::new(MemoryStore::default());
        Self::from_parts(crate::config::test_config(), store.clone(), store)
            .expect("test config is valid")
    }
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}
