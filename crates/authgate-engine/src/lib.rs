//! # AuthGate Engine
//!
//! Reference [`AuthEngine`] implementation: sled-backed users and refresh
//! tokens, Argon2id password hashes, HS256 access tokens, and an optional
//! email capability for address confirmation and password resets.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod jwt;
mod mailer;
/// Bootstrap helpers.
pub mod setup;
mod tokens;
mod users;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use authgate_core::{
    AuthEngine, Config, Credentials, DecodedToken, EmailConfig, EmailOutcome, EngineConfig,
    EngineError, TokenPair, User, UserLookup,
};

pub use jwt::TokenIssuer;
pub use mailer::{LogMailer, Mailer, MemoryMailer, OutgoingEmail};
pub use tokens::{EmailTokenPurpose, TokenStore};
pub use users::{UserRecord, UserStore};

/// The claim name that embeds user roles in access tokens.
pub const ROLES_CLAIM: &str = "roles";

struct EmailSender {
    config: EmailConfig,
    mailer: Arc<dyn Mailer>,
}

/// Reference authentication engine.
pub struct LocalEngine {
    users: UserStore,
    tokens: TokenStore,
    issuer: TokenIssuer,
    config: EngineConfig,
    email: Option<EmailSender>,
}

/// Builder for [`LocalEngine`].
pub struct LocalEngineBuilder {
    config: EngineConfig,
    email: Option<EmailSender>,
}

impl LocalEngineBuilder {
    /// Enable the email capability.
    #[must_use]
    pub fn with_email(mut self, config: EmailConfig, mailer: Arc<dyn Mailer>) -> Self {
        self.email = Some(EmailSender { config, mailer });
        self
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or the JWT secret is invalid.
    pub fn open(self, path: &Path) -> Result<LocalEngine, EngineError> {
        let db = sled::open(path.join("auth"))
            .map_err(|e| EngineError::Storage(format!("Failed to open auth database: {e}")))?;
        self.build(&db)
    }

    /// Use a throwaway in-memory database.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be created or the JWT secret is invalid.
    pub fn temporary(self) -> Result<LocalEngine, EngineError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| EngineError::Storage(format!("Failed to open auth database: {e}")))?;
        self.build(&db)
    }

    fn build(self, db: &sled::Db) -> Result<LocalEngine, EngineError> {
        let issuer = match &self.config.jwt_secret {
            Some(secret) => TokenIssuer::from_hex_secret(secret, self.config.access_token_ttl())?,
            None => {
                tracing::warn!(
                    "No JWT secret configured; generated an ephemeral one, tokens will not survive a restart"
                );
                TokenIssuer::new(
                    &TokenIssuer::generate_secret(),
                    self.config.access_token_ttl(),
                )
            }
        };

        Ok(LocalEngine {
            users: UserStore::open(db)?,
            tokens: TokenStore::open(db)?,
            issuer,
            config: self.config,
            email: self.email,
        })
    }
}

impl LocalEngine {
    /// Start building an engine.
    #[must_use]
    pub fn builder(config: EngineConfig) -> LocalEngineBuilder {
        LocalEngineBuilder {
            config,
            email: None,
        }
    }

    /// Open the engine described by a full configuration file. The email
    /// capability is enabled when `config.email` is present.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened.
    pub fn from_config(config: &Config, mailer: Arc<dyn Mailer>) -> Result<Self, EngineError> {
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| EngineError::Storage(format!("Failed to create data dir: {e}")))?;

        let mut builder = Self::builder(config.engine.clone());
        if let Some(email) = &config.email {
            builder = builder.with_email(email.clone(), mailer);
        }
        builder.open(&data_dir)
    }

    /// Whether the email capability is enabled.
    #[must_use]
    pub fn email_enabled(&self) -> bool {
        self.email.is_some()
    }

    /// Number of stored users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.count()
    }

    /// Create a user directly, bypassing registration.
    ///
    /// # Errors
    ///
    /// Returns error if the email is taken or storage fails.
    pub fn create_user(
        &self,
        email: &str,
        password: &str,
        roles: Vec<String>,
        email_verified: bool,
    ) -> Result<User, EngineError> {
        let mut record = UserRecord::new(email, password, roles)?;
        record.email_verified = email_verified;
        self.users.create(&record)?;

        tracing::info!(user_id = %record.id, email = %record.email, "User created");
        Ok(record.to_user())
    }

    /// List all users.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn list_users(&self) -> Result<Vec<User>, EngineError> {
        Ok(self.users.list()?.iter().map(UserRecord::to_user).collect())
    }

    /// Mark an address as confirmed without a token.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidUser`] if no user has this email.
    pub fn mark_verified(&self, email: &str) -> Result<User, EngineError> {
        let mut record = self.record_by_email(email)?;
        record.email_verified = true;
        self.users.update(&record)?;
        Ok(record.to_user())
    }

    fn record_by_email(&self, email: &str) -> Result<UserRecord, EngineError> {
        self.users
            .get_by_email(email)?
            .ok_or_else(|| EngineError::InvalidUser(UserLookup::Email(email.to_string()).to_string()))
    }

    fn email_sender(&self) -> Result<&EmailSender, EngineError> {
        self.email.as_ref().ok_or(EngineError::CapabilityDisabled)
    }

    fn access_token(&self, record: &UserRecord, with_roles: bool) -> Result<String, EngineError> {
        let roles = if with_roles {
            record.roles.clone()
        } else {
            Vec::new()
        };
        self.issuer.issue(&record.id, roles)
    }

    fn issue_pair(&self, record: &UserRecord, with_roles: bool) -> Result<TokenPair, EngineError> {
        Ok(TokenPair {
            access_token: self.access_token(record, with_roles)?,
            refresh_token: self
                .tokens
                .issue_refresh(&record.id, self.config.refresh_token_ttl())?,
        })
    }

    async fn mail_token(
        &self,
        purpose: EmailTokenPurpose,
        email: &str,
    ) -> Result<(), EngineError> {
        let sender = self.email_sender()?;
        let token = self
            .tokens
            .issue_email_token(purpose, email, sender.config.token_ttl())?;

        let (base, subject, action) = match purpose {
            EmailTokenPurpose::ConfirmEmail => (
                &sender.config.confirm_email_url,
                "Confirm your email",
                "confirm your email address",
            ),
            EmailTokenPurpose::ResetPassword => (
                &sender.config.reset_password_url,
                "Reset your password",
                "reset your password",
            ),
        };
        let link = Url::parse_with_params(base, &[("email", email), ("token", token.as_str())])
            .map_err(|e| EngineError::Internal(format!("Invalid link base {base}: {e}")))?
            .to_string();

        sender
            .mailer
            .send(OutgoingEmail {
                sender_name: sender.config.sender_name.clone(),
                from: sender.config.sender_email.clone(),
                to: email.to_string(),
                subject: subject.to_string(),
                text: format!("Follow this link to {action}: {link}"),
                link,
            })
            .await
    }
}

/// Run CPU-bound work (password hashing) off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, EngineError>
where
    F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| EngineError::Internal(format!("Blocking task failed: {e}")))?
}

impl std::fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEngine")
            .field("issuer", &self.issuer)
            .field("user_count", &self.users.count())
            .field("email_enabled", &self.email_enabled())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthEngine for LocalEngine {
    async fn register(&self, credentials: Credentials) -> Result<User, EngineError> {
        let roles = self.config.default_roles.clone();
        let record = blocking(move || {
            UserRecord::new(credentials.email, &credentials.password, roles)
        })
        .await?;
        self.users.create(&record)?;
        tracing::info!(user_id = %record.id, "User registered");

        // The account stands even if delivery fails; the address can ask
        // for a new confirmation email.
        if self.email.is_some() {
            if let Err(e) = self
                .mail_token(EmailTokenPurpose::ConfirmEmail, &record.email)
                .await
            {
                tracing::warn!(user_id = %record.id, error = %e, "Confirmation email not sent");
            }
        }

        Ok(record.to_user())
    }

    async fn login(
        &self,
        credentials: Credentials,
        claims: &[&str],
    ) -> Result<TokenPair, EngineError> {
        let record = self
            .users
            .get_by_email(&credentials.email)?
            .ok_or(EngineError::InvalidCredentials)?;

        let password = credentials.password;
        let record = blocking(move || record.verify_password(&password).map(|()| record)).await?;

        if self.email.is_some() && !record.email_verified {
            return Err(EngineError::EmailNotVerified(record.email));
        }

        self.issue_pair(&record, claims.contains(&ROLES_CLAIM))
    }

    async fn refresh_token(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, EngineError> {
        let previous = self.issuer.verify_ignoring_expiry(access_token)?;
        let refresh_token = self.tokens.rotate_refresh(
            &previous.sub,
            refresh_token,
            self.config.refresh_token_ttl(),
        )?;

        let record = self
            .users
            .get(&previous.sub)?
            .ok_or_else(|| EngineError::InvalidUser(UserLookup::Id(previous.sub.clone()).to_string()))?;

        // Keep the claim set of the token being replaced, with current roles.
        Ok(TokenPair {
            access_token: self.access_token(&record, !previous.data.roles.is_empty())?,
            refresh_token,
        })
    }

    async fn revoke_refresh_token(&self, subject_id: &str) -> Result<(), EngineError> {
        let existed = self.tokens.revoke_refresh(subject_id)?;
        tracing::info!(user_id = %subject_id, existed, "Refresh token revoked");
        Ok(())
    }

    fn verify_access_token(&self, token: &str) -> Result<Option<DecodedToken>, EngineError> {
        self.issuer.verify(token).map(Some)
    }

    async fn get_user(&self, lookup: &UserLookup) -> Result<Option<User>, EngineError> {
        let record = match lookup {
            UserLookup::Id(id) => self.users.get(id)?,
            UserLookup::Email(email) => self.users.get_by_email(email)?,
        };
        Ok(record.as_ref().map(UserRecord::to_user))
    }

    async fn send_confirmation_email(&self, email: &str) -> Result<(), EngineError> {
        self.email_sender()?;
        let record = self.record_by_email(email)?;
        if record.email_verified {
            return Err(EngineError::EmailAlreadyVerified(record.email));
        }

        self.mail_token(EmailTokenPurpose::ConfirmEmail, &record.email)
            .await
    }

    async fn confirm_email(&self, email: &str, token: &str) -> Result<EmailOutcome, EngineError> {
        self.email_sender()?;
        self.tokens
            .consume_email_token(EmailTokenPurpose::ConfirmEmail, email, token)?;

        let user = self.mark_verified(email)?;
        tracing::info!(user_id = %user.id, "Email confirmed");
        Ok(EmailOutcome::ok())
    }

    async fn send_reset_password_email(&self, email: &str) -> Result<EmailOutcome, EngineError> {
        self.email_sender()?;
        if self.users.get_by_email(email)?.is_none() {
            return Ok(EmailOutcome::failed(format!("User not found: {email}")));
        }

        match self.mail_token(EmailTokenPurpose::ResetPassword, email).await {
            Ok(()) => Ok(EmailOutcome::ok()),
            Err(e) => Ok(EmailOutcome::failed(e.to_string())),
        }
    }

    async fn confirm_reset_password(
        &self,
        email: &str,
        token: &str,
        password: &str,
    ) -> Result<EmailOutcome, EngineError> {
        self.email_sender()?;
        self.tokens
            .consume_email_token(EmailTokenPurpose::ResetPassword, email, token)?;

        let mut record = self.record_by_email(email)?;
        let password = password.to_string();
        let record = blocking(move || {
            record.set_password(&password)?;
            Ok(record)
        })
        .await?;
        self.users.update(&record)?;
        self.tokens.revoke_refresh(&record.id)?;

        tracing::info!(user_id = %record.id, "Password reset");
        Ok(EmailOutcome::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn email_config() -> EmailConfig {
        EmailConfig {
            sender_name: "AuthGate".to_string(),
            sender_email: "noreply@example.com".to_string(),
            confirm_email_url: "http://localhost/confirm".to_string(),
            reset_password_url: "http://localhost/reset".to_string(),
            token_expiry_minutes: 60,
        }
    }

    fn plain_engine() -> LocalEngine {
        LocalEngine::builder(EngineConfig::default())
            .temporary()
            .unwrap()
    }

    fn email_engine() -> (LocalEngine, Arc<MemoryMailer>) {
        let mailer = Arc::new(MemoryMailer::new());
        let engine = LocalEngine::builder(EngineConfig::default())
            .with_email(email_config(), mailer.clone())
            .temporary()
            .unwrap();
        (engine, mailer)
    }

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials::new(email, password)
    }

    struct DownMailer;

    #[async_trait]
    impl Mailer for DownMailer {
        async fn send(&self, _email: OutgoingEmail) -> Result<(), EngineError> {
            Err(EngineError::Delivery("smtp down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let engine = plain_engine();
        let user = engine.register(creds("a@b.com", "secret1")).await.unwrap();
        assert_eq!(user.roles, vec!["user".to_string()]);

        let pair = engine
            .login(creds("a@b.com", "secret1"), &[ROLES_CLAIM])
            .await
            .unwrap();
        let decoded = engine.verify_access_token(&pair.access_token).unwrap().unwrap();
        assert_eq!(decoded.sub, user.id);
        assert_eq!(decoded.data.roles, vec!["user".to_string()]);
    }

    #[tokio::test]
    async fn test_login_without_roles_claim() {
        let engine = plain_engine();
        engine.register(creds("a@b.com", "secret1")).await.unwrap();
        let pair = engine.login(creds("a@b.com", "secret1"), &[]).await.unwrap();
        let decoded = engine.verify_access_token(&pair.access_token).unwrap().unwrap();
        assert!(decoded.data.roles.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let engine = plain_engine();
        engine.register(creds("a@b.com", "secret1")).await.unwrap();
        let err = engine.register(creds("a@b.com", "secret1")).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already registered: a@b.com");
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        let engine = plain_engine();
        engine.register(creds("a@b.com", "secret1")).await.unwrap();

        assert!(matches!(
            engine.login(creds("a@b.com", "wrong-pass"), &[]).await,
            Err(EngineError::InvalidCredentials)
        ));
        assert!(matches!(
            engine.login(creds("x@y.com", "secret1"), &[]).await,
            Err(EngineError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_pair() {
        let engine = plain_engine();
        engine.register(creds("a@b.com", "secret1")).await.unwrap();
        let pair = engine
            .login(creds("a@b.com", "secret1"), &[ROLES_CLAIM])
            .await
            .unwrap();

        let next = engine
            .refresh_token(&pair.access_token, &pair.refresh_token)
            .await
            .unwrap();
        assert_ne!(next.refresh_token, pair.refresh_token);
        let decoded = engine.verify_access_token(&next.access_token).unwrap().unwrap();
        assert_eq!(decoded.data.roles, vec!["user".to_string()]);

        // The rotated-out refresh token is dead.
        assert!(matches!(
            engine
                .refresh_token(&pair.access_token, &pair.refresh_token)
                .await,
            Err(EngineError::InvalidRefreshToken)
        ));
    }

    #[tokio::test]
    async fn test_refresh_with_expired_access_token() {
        let engine = plain_engine();
        let user = engine.register(creds("a@b.com", "secret1")).await.unwrap();
        let pair = engine.login(creds("a@b.com", "secret1"), &[]).await.unwrap();

        let now = chrono::Utc::now().timestamp();
        let expired = engine
            .issuer
            .sign(&DecodedToken {
                sub: user.id.clone(),
                data: authgate_core::TokenData::default(),
                iat: now - 3600,
                exp: now - 60,
            })
            .unwrap();

        assert!(engine.verify_access_token(&expired).is_err());
        let next = engine
            .refresh_token(&expired, &pair.refresh_token)
            .await
            .unwrap();
        assert!(engine.verify_access_token(&next.access_token).is_ok());
    }

    #[tokio::test]
    async fn test_revoke() {
        let engine = plain_engine();
        let user = engine.register(creds("a@b.com", "secret1")).await.unwrap();
        let pair = engine.login(creds("a@b.com", "secret1"), &[]).await.unwrap();

        engine.revoke_refresh_token(&user.id).await.unwrap();
        assert!(
            engine
                .refresh_token(&pair.access_token, &pair.refresh_token)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_get_user() {
        let engine = plain_engine();
        let user = engine.register(creds("a@b.com", "secret1")).await.unwrap();

        let by_id = engine.get_user(&UserLookup::Id(user.id.clone())).await.unwrap();
        let by_email = engine
            .get_user(&UserLookup::Email("a@b.com".into()))
            .await
            .unwrap();
        assert_eq!(by_id, Some(user.clone()));
        assert_eq!(by_email, Some(user));
        assert!(
            engine
                .get_user(&UserLookup::Email("x@y.com".into()))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_email_operations_disabled() {
        let engine = plain_engine();
        assert!(matches!(
            engine.send_confirmation_email("a@b.com").await,
            Err(EngineError::CapabilityDisabled)
        ));
        assert!(matches!(
            engine.send_reset_password_email("a@b.com").await,
            Err(EngineError::CapabilityDisabled)
        ));
    }

    #[tokio::test]
    async fn test_unverified_login_with_email_capability() {
        let (engine, mailer) = email_engine();
        engine.register(creds("a@b.com", "secret1")).await.unwrap();

        let err = engine.login(creds("a@b.com", "secret1"), &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Email not verified: a@b.com");

        let token = mailer.last_to("a@b.com").unwrap().token().unwrap();
        assert_eq!(
            engine.confirm_email("a@b.com", &token).await.unwrap(),
            EmailOutcome::ok()
        );
        assert!(engine.login(creds("a@b.com", "secret1"), &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_resend_invalidates_previous_token() {
        let (engine, mailer) = email_engine();
        engine.register(creds("a@b.com", "secret1")).await.unwrap();
        let first = mailer.last_to("a@b.com").unwrap().token().unwrap();

        engine.send_confirmation_email("a@b.com").await.unwrap();
        let second = mailer.last_to("a@b.com").unwrap().token().unwrap();
        assert_ne!(first, second);

        assert!(matches!(
            engine.confirm_email("a@b.com", &first).await,
            Err(EngineError::InvalidEmailToken)
        ));
        assert!(engine.confirm_email("a@b.com", &second).await.is_ok());
        assert!(matches!(
            engine.send_confirmation_email("a@b.com").await,
            Err(EngineError::EmailAlreadyVerified(_))
        ));
    }

    #[tokio::test]
    async fn test_link_encodes_address() {
        let (engine, mailer) = email_engine();
        engine.register(creds("a+tag@b.com", "secret1")).await.unwrap();

        let sent = mailer.last_to("a+tag@b.com").unwrap();
        assert!(sent.link.starts_with("http://localhost/confirm?email=a%2Btag%40b.com&token="));
        assert_eq!(sent.link_email().as_deref(), Some("a+tag@b.com"));

        let token = sent.token().unwrap();
        assert!(engine.confirm_email("a+tag@b.com", &token).await.is_ok());
        assert!(engine.login(creds("a+tag@b.com", "secret1"), &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_survives_mail_failure() {
        let engine = LocalEngine::builder(EngineConfig::default())
            .with_email(email_config(), Arc::new(DownMailer))
            .temporary()
            .unwrap();

        let user = engine.register(creds("a@b.com", "secret1")).await.unwrap();
        assert_eq!(user.email, "a@b.com");
        assert_eq!(engine.user_count(), 1);

        let err = engine.register(creds("a@b.com", "secret1")).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already registered: a@b.com");
        assert_eq!(engine.user_count(), 1);

        // Resending reports the delivery failure to the caller.
        assert!(matches!(
            engine.send_confirmation_email("a@b.com").await,
            Err(EngineError::Delivery(_))
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_runs_on_current_thread_runtime() {
        let engine = plain_engine();
        engine.register(creds("a@b.com", "secret1")).await.unwrap();
        assert!(engine.login(creds("a@b.com", "secret1"), &[]).await.is_ok());
        assert!(engine.login(creds("a@b.com", "wrong-pass"), &[]).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_has_one_winner() {
        let engine = Arc::new(plain_engine());
        engine.register(creds("a@b.com", "secret1")).await.unwrap();
        let pair = engine.login(creds("a@b.com", "secret1"), &[]).await.unwrap();

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let pair = pair.clone();
                tokio::spawn(async move {
                    engine
                        .refresh_token(&pair.access_token, &pair.refresh_token)
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_password_reset() {
        let (engine, mailer) = email_engine();
        engine.create_user("a@b.com", "secret1", vec!["user".into()], true).unwrap();

        let outcome = engine.send_reset_password_email("a@b.com").await.unwrap();
        assert!(outcome.success);
        let reset = mailer.last_to("a@b.com").unwrap();
        assert_eq!(reset.subject, "Reset your password");
        let token = reset.token().unwrap();

        assert!(
            engine
                .confirm_reset_password("a@b.com", "wrong", "newpass1")
                .await
                .is_err()
        );
        engine
            .confirm_reset_password("a@b.com", &token, "newpass1")
            .await
            .unwrap();

        assert!(engine.login(creds("a@b.com", "secret1"), &[]).await.is_err());
        assert!(engine.login(creds("a@b.com", "newpass1"), &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_unknown_email_reports_failure() {
        let (engine, mailer) = email_engine();
        let outcome = engine.send_reset_password_email("x@y.com").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("User not found: x@y.com"));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.engine.data_dir = Some(dir.path().to_path_buf());
        config.engine.jwt_secret = Some(TokenIssuer::generate_hex_secret());

        let pair = {
            let engine = LocalEngine::from_config(&config, Arc::new(LogMailer)).unwrap();
            assert!(!engine.email_enabled());
            engine.register(creds("a@b.com", "secret1")).await.unwrap();
            engine.login(creds("a@b.com", "secret1"), &[]).await.unwrap()
        };

        let engine = LocalEngine::from_config(&config, Arc::new(LogMailer)).unwrap();
        assert_eq!(engine.user_count(), 1);
        assert!(engine.verify_access_token(&pair.access_token).is_ok());
        assert!(
            engine
                .refresh_token(&pair.access_token, &pair.refresh_token)
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_admin_helpers() {
        let engine = plain_engine();
        engine
            .create_user("admin@b.com", "admin-pass", vec!["admin".into()], false)
            .unwrap();
        assert_eq!(engine.user_count(), 1);

        let user = engine.mark_verified("admin@b.com").unwrap();
        assert!(user.email_verified);
        assert_eq!(engine.list_users().unwrap(), vec![user]);
        assert!(engine.mark_verified("x@y.com").is_err());
    }
}
