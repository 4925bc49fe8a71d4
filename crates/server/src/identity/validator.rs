use crate::config::LockoutConfig;
use crate::entity::user;
use crate::error::{AccountError, CredentialError};
use crate::identity::password::PasswordHashing;
use crate::identity::policy::{PasswordPolicy, is_plausible_email};
use crate::store::UserRepository;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

#[derive(Clone)]
pub struct CredentialValidator {
    users: UserRepository,
    hashing: PasswordHashing,
    policy: Arc<dyn PasswordPolicy>,
    lockout: LockoutConfig,
}

impl CredentialValidator {
    pub fn new(
        users: UserRepository,
        hashing: PasswordHashing,
        policy: Arc<dyn PasswordPolicy>,
        lockout: LockoutConfig,
    ) -> Self {
        Self {
            users,
            hashing,
            policy,
            lockout,
        }
    }

    /// Check an interactive sign-in attempt.
    #[tracing::instrument(skip(self, password))]
    pub async fn validate_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, CredentialError> {
        let Some(account) = self.users.find_by_email(email).await? else {
            // Match the cost of a real password check.
            self.hashing.verify_dummy(password);
            return Err(CredentialError::UserNotFound);
        };
        let account = self.check_lock(account).await?;
        let account = self.check_password(account, password).await?;
        let account = Self::check_status(account)?;
        Ok(self.users.record_successful_login(account).await?)
    }

    /// Check a sign-in the hub already remembers; the password step is skipped.
    #[tracing::instrument(skip(self))]
    pub async fn validate_auto_login(&self, user_id: &str) -> Result<user::Model, CredentialError> {
        let account = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(CredentialError::UserNotFound)?;
        let account = self.check_lock(account).await?;
        Self::check_status(account)
    }

    async fn check_lock(&self, account: user::Model) -> Result<user::Model, CredentialError> {
        let now = OffsetDateTime::now_utc();
        match account.locked_until {
            Some(until) if until > now => Err(CredentialError::AccountLocked { until }),
            Some(_) => {
                tracing::debug!(user_id = %account.id, "lock window elapsed, clearing lock");
                Ok(self.users.clear_lock(account).await?)
            }
            None => Ok(account),
        }
    }

    async fn check_password(
        &self,
        account: user::Model,
        password: &str,
    ) -> Result<user::Model, CredentialError> {
        if !self.hashing.verify(password, &account.password_hash) {
            let lock_until =
                OffsetDateTime::now_utc() + Duration::seconds(self.lockout.window_secs);
            let updated = self
                .users
                .record_failed_login(&account.id, self.lockout.threshold, lock_until)
                .await?;
            return match updated.locked_until {
                Some(until) if updated.failed_login_count >= self.lockout.threshold => {
                    tracing::warn!(
                        name = "identity.account_locked",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        user_id = %updated.id,
                        failures = updated.failed_login_count,
                        message = "Account locked after repeated password failures"
                    );
                    Err(CredentialError::AccountLocked { until })
                }
                _ => Err(CredentialError::IncorrectPassword),
            };
        }

        let mut account = account;
        if self.hashing.needs_rehash(&account.password_hash) {
            match self.hashing.hash(password) {
                Ok(hash) => {
                    account = self.users.update_password_hash(account, &hash).await?;
                    tracing::info!(user_id = %account.id, "password rehashed with current parameters");
                }
                Err(e) => {
                    tracing::warn!(user_id = %account.id, error = %e, "password rehash failed");
                }
            }
        }
        Ok(self.users.clear_failures(account).await?)
    }

    fn check_status(account: user::Model) -> Result<user::Model, CredentialError> {
        if !account.active {
            return Err(CredentialError::AccountDisabled);
        }
        if !account.verified {
            return Err(CredentialError::EmailNotVerified {
                user_id: account.id,
            });
        }
        Ok(account)
    }

    /// Check a registration request without creating anything.
    pub async fn validate_signup(&self, email: &str, password: &str) -> Result<(), AccountError> {
        if !is_plausible_email(email.trim()) {
            return Err(AccountError::InvalidEmail);
        }
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AccountError::EmailInUse);
        }
        self.policy
            .check(password)
            .map_err(AccountError::PasswordTooWeak)
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, AccountError> {
        let hash = self
            .hashing
            .hash(password)
            .map_err(|e| AccountError::Hashing(e.to_string()))?;
        let account = self.users.create(email, &hash).await?;
        tracing::info!(user_id = %account.id, "account created");
        Ok(account)
    }

    pub async fn confirm_email(&self, user_id: &str) -> Result<user::Model, AccountError> {
        let account = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::UnknownAccount)?;
        Ok(self.users.mark_verified(account).await?)
    }

    /// Set a new password after a reset. The old lock and failure count are dropped.
    #[tracing::instrument(skip(self, password))]
    pub async fn reset_password(
        &self,
        user_id: &str,
        password: &str,
    ) -> Result<user::Model, AccountError> {
        self.policy
            .check(password)
            .map_err(AccountError::PasswordTooWeak)?;
        let account = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::UnknownAccount)?;
        let hash = self
            .hashing
            .hash(password)
            .map_err(|e| AccountError::Hashing(e.to_string()))?;
        Ok(self.users.reset_password_hash(account, &hash).await?)
    }
}
