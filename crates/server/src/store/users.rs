//! Account persistence.

use crate::entity::user;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, TransactionTrait,
};
use std::sync::Arc;
use time::OffsetDateTime;

/// Case-fold an email address the way it is stored.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone, Debug)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(self.db.as_ref())
            .await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find_by_id(id).one(self.db.as_ref()).await
    }

    /// Insert a new, active, unverified, non-superuser account.
    pub async fn create(&self, email: &str, password_hash: &str) -> Result<user::Model, DbErr> {
        let account = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            email: Set(normalize_email(email)),
            password_hash: Set(password_hash.to_string()),
            active: Set(true),
            verified: Set(false),
            superuser: Set(false),
            failed_login_count: Set(0),
            locked_until: Set(None),
            created_at: Set(OffsetDateTime::now_utc()),
            last_login_at: Set(None),
        };
        account.insert(self.db.as_ref()).await
    }

    /// Count a password failure and lock the account once `threshold` is reached.
    ///
    /// The increment is a single `count = count + 1` statement and the lock is a conditional
    /// update on the stored count, both in one transaction, so concurrent guesses cannot
    /// slip past the threshold.
    pub async fn record_failed_login(
        &self,
        id: &str,
        threshold: i32,
        lock_until: OffsetDateTime,
    ) -> Result<user::Model, DbErr> {
        let txn = self.db.begin().await?;

        user::Entity::update_many()
            .col_expr(
                user::Column::FailedLoginCount,
                Expr::col(user::Column::FailedLoginCount).add(1),
            )
            .filter(user::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        user::Entity::update_many()
            .col_expr(user::Column::LockedUntil, Expr::value(Some(lock_until)))
            .filter(user::Column::Id.eq(id))
            .filter(user::Column::FailedLoginCount.gte(threshold))
            .exec(&txn)
            .await?;

        let updated = user::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("user {id}")))?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Drop an expired lock together with the failure count that caused it.
    pub async fn clear_lock(&self, account: user::Model) -> Result<user::Model, DbErr> {
        let mut active: user::ActiveModel = account.into();
        active.locked_until = Set(None);
        active.failed_login_count = Set(0);
        active.update(self.db.as_ref()).await
    }

    /// Reset the failure count after a matching password, leaving `last_login_at` alone.
    pub async fn clear_failures(&self, account: user::Model) -> Result<user::Model, DbErr> {
        if account.failed_login_count == 0 {
            return Ok(account);
        }
        let mut active: user::ActiveModel = account.into();
        active.failed_login_count = Set(0);
        active.update(self.db.as_ref()).await
    }

    pub async fn record_successful_login(
        &self,
        account: user::Model,
    ) -> Result<user::Model, DbErr> {
        let mut active: user::ActiveModel = account.into();
        active.failed_login_count = Set(0);
        active.last_login_at = Set(Some(OffsetDateTime::now_utc()));
        active.update(self.db.as_ref()).await
    }

    pub async fn update_password_hash(
        &self,
        account: user::Model,
        password_hash: &str,
    ) -> Result<user::Model, DbErr> {
        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(password_hash.to_string());
        active.update(self.db.as_ref()).await
    }

    /// Replace the password after a reset; this also lifts any lockout.
    pub async fn reset_password_hash(
        &self,
        account: user::Model,
        password_hash: &str,
    ) -> Result<user::Model, DbErr> {
        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(password_hash.to_string());
        active.failed_login_count = Set(0);
        active.locked_until = Set(None);
        active.update(self.db.as_ref()).await
    }

    pub async fn mark_verified(&self, account: user::Model) -> Result<user::Model, DbErr> {
        if account.verified {
            return Ok(account);
        }
        let mut active: user::ActiveModel = account.into();
        active.verified = Set(true);
        active.update(self.db.as_ref()).await
    }
}
