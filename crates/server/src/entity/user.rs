//! User entity - an account that can sign in through the hub.

use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Always stored trimmed and lowercased.
    #[sea_orm(unique)]
    pub email: String,
    /// PHC-formatted Argon2 hash.
    pub password_hash: String,
    pub active: bool,
    pub verified: bool,
    pub superuser: bool,
    pub failed_login_count: i32,
    pub locked_until: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub last_login_at: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
