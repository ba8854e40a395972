//! Registration and login.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use stockroute_auth::{
    CredentialHasher, JwtClaims, JwtIssuer, NewUser, PasswordHashError, Role, TokenError, User,
};
use stockroute_core::DomainError;
use stockroute_infra::AnyDatabase;
use stockroute_inventory::{Database, StoreError, UnitOfWork, UserStore};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Unknown username or wrong password; deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Hash(#[from] PasswordHashError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("credential worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// A freshly issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct AccountService {
    db: AnyDatabase,
    hasher: Arc<dyn CredentialHasher>,
    issuer: Arc<dyn JwtIssuer>,
    token_ttl: chrono::Duration,
}

impl core::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountService")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    pub fn new(
        db: AnyDatabase,
        hasher: Arc<dyn CredentialHasher>,
        issuer: Arc<dyn JwtIssuer>,
        token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            db,
            hasher,
            issuer,
            token_ttl,
        }
    }

    /// Create a user and sign them in. Username and email must be unused.
    #[instrument(skip(self, input), fields(username = %input.username, role = %input.role), err)]
    pub async fn register(&self, input: NewUser) -> Result<IssuedToken, AccountError> {
        input.validate()?;
        let hash = self.hash_password(input.password.clone()).await?;
        let user = input.into_user(hash, Utc::now());

        let mut uow = self.db.begin().await?;
        uow.save_user(&user).await?;
        uow.commit().await?;

        info!(user_id = %user.id, "user registered");
        self.issue(&user)
    }

    #[instrument(skip(self, password), err)]
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AccountError> {
        let mut uow = self.db.begin().await?;
        let user = uow.find_user_by_username(username.trim()).await?;
        uow.rollback().await?;

        let Some(user) = user else {
            return Err(AccountError::InvalidCredentials);
        };
        if !self.verify_password(password.to_string(), user.password_hash.clone()).await? {
            return Err(AccountError::InvalidCredentials);
        }
        self.issue(&user)
    }

    // Hashing runs on the blocking pool.
    async fn hash_password(&self, password: String) -> Result<String, AccountError> {
        let hasher = self.hasher.clone();
        Ok(tokio::task::spawn_blocking(move || hasher.hash(&password)).await??)
    }

    async fn verify_password(&self, password: String, stored_hash: String) -> Result<bool, AccountError> {
        let hasher = self.hasher.clone();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash)).await?)
    }

    fn issue(&self, user: &User) -> Result<IssuedToken, AccountError> {
        let claims = JwtClaims::new(
            user.id,
            user.username.clone(),
            user.role,
            Utc::now(),
            self.token_ttl,
        );
        Ok(IssuedToken {
            token: self.issuer.issue(&claims)?,
            role: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    use stockroute_auth::{Argon2Hasher, Hs256Jwt};
    use stockroute_infra::InMemoryDatabase;

    use super::*;

    /// Argon2 wrapper that remembers which threads did the work.
    #[derive(Default)]
    struct ThreadRecordingHasher {
        inner: Argon2Hasher,
        threads: Mutex<Vec<ThreadId>>,
    }

    impl CredentialHasher for ThreadRecordingHasher {
        fn hash(&self, password: &str) -> Result<String, PasswordHashError> {
            self.threads.lock().unwrap().push(thread::current().id());
            self.inner.hash(password)
        }

        fn verify(&self, password: &str, stored_hash: &str) -> bool {
            self.threads.lock().unwrap().push(thread::current().id());
            self.inner.verify(password, stored_hash)
        }
    }

    fn service(hasher: Arc<ThreadRecordingHasher>) -> AccountService {
        AccountService::new(
            AnyDatabase::from(InMemoryDatabase::new()),
            hasher,
            Arc::new(Hs256Jwt::new("accounts-test")),
            chrono::Duration::minutes(5),
        )
    }

    fn new_user(password: &str) -> NewUser {
        NewUser {
            username: "ines".to_string(),
            email: "ines@example.com".to_string(),
            password: password.to_string(),
            role: Role::WarehouseStaff,
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn hashing_runs_off_the_runtime_thread() {
        let hasher = Arc::new(ThreadRecordingHasher::default());
        let accounts = service(hasher.clone());

        accounts.register(new_user("s3cret")).await.unwrap();
        accounts.login("ines", "s3cret").await.unwrap();

        let runtime_thread = thread::current().id();
        let threads = hasher.threads.lock().unwrap().clone();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|t| *t != runtime_thread));
    }

    #[tokio::test]
    async fn login_rejects_unknown_users_and_wrong_passwords_alike() {
        let accounts = service(Arc::new(ThreadRecordingHasher::default()));
        let issued = accounts.register(new_user("s3cret")).await.unwrap();
        assert_eq!(issued.role, Role::WarehouseStaff);

        assert!(matches!(
            accounts.login("ines", "wrong").await,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.login("nobody", "s3cret").await,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(accounts.login("  ines ", "s3cret").await.is_ok());
    }
}
