use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::auth::{
    dto::{PublicUser, RegisterRequest},
    password::PasswordHasher,
    repo::{CreateUserError, UserRepo},
    repo_types::{NewUser, User, UserFilter},
};
use crate::validation::{is_valid_email, Violations};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("invalid registration: {0:?}")]
    Invalid(Vec<String>),
    #[error("email already in use")]
    EmailInUse,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Outcome of a failed credential check. The two rejection kinds stay
/// distinct here; the HTTP layer folds them into one message.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("no user with that email")]
    NotFound,
    #[error("password mismatch")]
    WrongPassword,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Emails are stored and looked up trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_password(v: &mut Violations, password: &str) {
    v.check_present(
        "password",
        password,
        Some((
            "min=6",
            password.chars().count() >= MIN_PASSWORD_LEN,
        )),
    );
}

/// Persists users and checks their passwords.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserRepo>,
    hasher: PasswordHasher,
    /// Verified against when the email is unknown, so both rejections cost
    /// one Argon2 run.
    decoy_hash: Arc<str>,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserRepo>, hasher: PasswordHasher) -> anyhow::Result<Self> {
        let decoy_hash = hasher
            .hash(&uuid::Uuid::new_v4().to_string())
            .context("hash decoy password")?;
        Ok(Self {
            users,
            hasher,
            decoy_hash: decoy_hash.into(),
        })
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User, RegisterError> {
        let email = normalize_email(&req.email);

        let mut v = Violations::new();
        v.check_present("name", &req.name, None)
            .check_present("email", &email, Some(("email", is_valid_email(&email))))
            .check_present("gender", &req.gender, None);
        validate_password(&mut v, &req.password);
        v.finish().map_err(RegisterError::Invalid)?;

        if self.users.find_by_email(&email).await?.is_some() {
            debug!(email = %email, "email already registered");
            return Err(RegisterError::EmailInUse);
        }

        let hasher = self.hasher.clone();
        let password = req.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("password hashing task failed")??;

        let user = self
            .users
            .create(NewUser {
                name: req.name.trim().to_string(),
                email,
                gender: req.gender.trim().to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                CreateUserError::EmailTaken => RegisterError::EmailInUse,
                CreateUserError::Other(e) => RegisterError::Internal(e),
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn verify(&self, email: &str, password: &str) -> Result<User, VerifyError> {
        let email = normalize_email(email);
        let user = self.users.find_by_email(&email).await?;

        let hasher = self.hasher.clone();
        let hash = match &user {
            Some(u) => u.password_hash.clone(),
            None => self.decoy_hash.to_string(),
        };
        let password = password.to_owned();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .context("password verification task failed")??;

        match user {
            Some(user) if ok => Ok(user),
            Some(_) => Err(VerifyError::WrongPassword),
            None => Err(VerifyError::NotFound),
        }
    }

    pub async fn list(&self, filter: &UserFilter) -> anyhow::Result<Vec<PublicUser>> {
        let users = self.users.list(filter).await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::memory::MemoryStore;

    fn store() -> CredentialStore {
        let hasher = PasswordHasher::new(&test_config().password).unwrap();
        CredentialStore::new(Arc::new(MemoryStore::default()), hasher).unwrap()
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            name: "Alice".into(),
            email: "alice@test.com".into(),
            gender: "female".into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn register_then_verify() {
        let store = store();
        let user = store.register(alice()).await.expect("register");
        assert_ne!(user.password_hash, "secret1");

        let found = store.verify("alice@test.com", "secret1").await.expect("verify");
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn verify_distinguishes_missing_user_from_wrong_password() {
        let store = store();
        store.register(alice()).await.unwrap();

        let missing = store.verify("bob@test.com", "secret1").await.unwrap_err();
        assert!(matches!(missing, VerifyError::NotFound));

        let wrong = store.verify("alice@test.com", "secret2").await.unwrap_err();
        assert!(matches!(wrong, VerifyError::WrongPassword));
    }

    #[tokio::test]
    async fn unknown_email_still_runs_a_password_check() {
        let store = store();
        store.register(alice()).await.unwrap();
        assert_eq!(store.hasher.verifications(), 0);

        store.verify("bob@test.com", "secret1").await.unwrap_err();
        assert_eq!(store.hasher.verifications(), 1);

        store.verify("alice@test.com", "secret2").await.unwrap_err();
        assert_eq!(store.hasher.verifications(), 2);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_and_keeps_first_user() {
        let store = store();
        let first = store.register(alice()).await.unwrap();

        let mut again = alice();
        again.email = "  ALICE@test.com ".into();
        again.password = "another-password".into();
        let err = store.register(again).await.unwrap_err();
        assert!(matches!(err, RegisterError::EmailInUse));

        let still = store.verify("alice@test.com", "secret1").await.unwrap();
        assert_eq!(still.id, first.id);
        assert!(store.verify("alice@test.com", "another-password").await.is_err());
    }

    #[tokio::test]
    async fn register_reports_every_invalid_field() {
        let store = store();
        let err = store
            .register(RegisterRequest {
                name: " ".into(),
                email: "not-an-email".into(),
                gender: String::new(),
                password: "12345".into(),
            })
            .await
            .unwrap_err();
        match err {
            RegisterError::Invalid(errors) => assert_eq!(errors.len(), 4),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_never_includes_hash() {
        let store = store();
        store.register(alice()).await.unwrap();
        let users = store.list(&UserFilter::default()).await.unwrap();
        assert_eq!(users.len(), 1);
        let json = serde_json::to_value(&users).unwrap();
        assert!(json[0].get("password_hash").is_none());
        assert!(json[0].get("password").is_none());
        assert_eq!(json[0]["email"], "alice@test.com");
    }
}
