//! Shared fixtures: an in-memory database with the real schema, a configuration pointing
//! at a mock hub, and helpers to seed accounts and the privilege graph.

#![allow(dead_code)]

use idp_bridge::AppResources;
use idp_bridge::config::{
    AppConfig, Environment, HubConfig, LockoutConfig, PasswordConfig, SmtpConfig,
};
use idp_bridge::email::{AccountEmail, EmailError, EmailSender};
use idp_bridge::entity::{capability, institution, member, privilege, role, scope, user};
use idp_bridge::flows::FlowState;
use idp_bridge::identity::PasswordHashing;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter,
};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

pub const PASSWORD: &str = "correct-horse-1";

/// Create a migrated in-memory database.
pub async fn create_test_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await.expect("connect");
    Migrator::up(&db, None).await.expect("run migrations");
    Arc::new(db)
}

/// Cheap argon2 parameters so tests stay fast.
pub fn test_password_config() -> PasswordConfig {
    PasswordConfig {
        min_length: 8,
        argon2_memory_kib: 64,
        argon2_iterations: 1,
        argon2_parallelism: 1,
    }
}

pub fn create_test_config(hub_url: &str) -> AppConfig {
    AppConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        database_url: "sqlite::memory:".to_string(),
        public_url: "https://login.example.org".to_string(),
        environment: Environment::Development,
        token_secret: "test-secret-test-secret-test-secret".to_string(),
        token_max_age_secs: 3600,
        remember_login: true,
        remember_for: 604_800,
        smtp: SmtpConfig {
            server: "localhost".to_string(),
            port: 2525,
            username: "test".to_string(),
            password: "test".to_string(),
            from: "noreply@example.org".to_string(),
        },
        hub: HubConfig {
            admin_url: hub_url.to_string(),
            verify_tls: true,
            timeout_secs: Some(5),
        },
        password: test_password_config(),
        lockout: LockoutConfig {
            threshold: 5,
            window_secs: 900,
        },
    }
}

pub async fn create_test_resources(hub_url: &str) -> AppResources {
    let mailer = Arc::new(
        lettre::AsyncSmtpTransport::<lettre::Tokio1Executor>::builder_dangerous("localhost")
            .port(2525)
            .build(),
    );
    AppResources {
        db: create_test_db().await,
        mailer,
        config: Arc::new(create_test_config(hub_url)),
    }
}

pub async fn create_test_state(hub_url: &str) -> (FlowState, AppResources) {
    let resources = create_test_resources(hub_url).await;
    let state = FlowState::new(&resources).expect("flow state");
    (state, resources)
}

/// Captures account email instead of delivering it.
#[derive(Clone, Default)]
pub struct RecordingSender {
    sent: Arc<Mutex<Vec<AccountEmail>>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<AccountEmail> {
        self.sent.lock().expect("sender lock").clone()
    }

    /// The `token` query parameter of the only link sent so far.
    pub fn only_token(&self) -> String {
        let sent = self.sent();
        assert_eq!(sent.len(), 1, "expected exactly one email, got {sent:?}");
        let (_, token) = sent[0]
            .link()
            .split_once("token=")
            .expect("link carries a token");
        urlencoding::decode(token).expect("url-encoded token").into_owned()
    }
}

impl EmailSender for RecordingSender {
    fn send(&self, email: AccountEmail) -> Result<(), EmailError> {
        self.sent.lock().expect("sender lock").push(email);
        Ok(())
    }
}

/// Like [`create_test_state`], with outgoing email captured.
pub async fn create_recording_state(
    hub_url: &str,
) -> (FlowState, AppResources, RecordingSender) {
    let (mut state, resources) = create_test_state(hub_url).await;
    let outbox = RecordingSender::default();
    state.mailer = Arc::new(outbox.clone());
    (state, resources, outbox)
}

pub fn test_hashing() -> PasswordHashing {
    PasswordHashing::new(&test_password_config()).expect("argon2 params")
}

/// Account attributes for [`insert_user`]; defaults to an active, verified,
/// non-superuser account with password [`PASSWORD`].
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub active: bool,
    pub verified: bool,
    pub superuser: bool,
}

impl<'a> NewUser<'a> {
    pub fn new(email: &'a str) -> Self {
        Self {
            email,
            password: PASSWORD,
            active: true,
            verified: true,
            superuser: false,
        }
    }
}

pub async fn insert_user(db: &DatabaseConnection, new: NewUser<'_>) -> user::Model {
    let hash = test_hashing().hash(new.password).expect("hash");
    insert_user_with_hash(db, new, hash).await
}

pub async fn insert_user_with_hash(
    db: &DatabaseConnection,
    new: NewUser<'_>,
    password_hash: String,
) -> user::Model {
    user::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        email: Set(new.email.to_string()),
        password_hash: Set(password_hash),
        active: Set(new.active),
        verified: Set(new.verified),
        superuser: Set(new.superuser),
        failed_login_count: Set(0),
        locked_until: Set(None),
        created_at: Set(OffsetDateTime::now_utc()),
        last_login_at: Set(None),
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn reload_user(db: &DatabaseConnection, id: &str) -> user::Model {
    user::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("query user")
        .expect("user exists")
}

async fn ensure_institution(db: &DatabaseConnection, key: &str) -> institution::Model {
    if let Some(found) = institution::Entity::find()
        .filter(institution::Column::Key.eq(key))
        .one(db)
        .await
        .expect("query institution")
    {
        return found;
    }
    institution::ActiveModel {
        id: Set(format!("inst-{key}")),
        key: Set(key.to_string()),
        name: Set(format!("Institution {key}")),
        parent_id: Set(None),
        registry_id: Set(Some("registry-1".to_string())),
    }
    .insert(db)
    .await
    .expect("insert institution")
}

async fn ensure_role(db: &DatabaseConnection, key: &str) -> role::Model {
    if let Some(found) = role::Entity::find()
        .filter(role::Column::Key.eq(key))
        .one(db)
        .await
        .expect("query role")
    {
        return found;
    }
    role::ActiveModel {
        id: Set(format!("role-{key}")),
        key: Set(key.to_string()),
        name: Set(format!("Role {key}")),
        is_admin: Set(false),
    }
    .insert(db)
    .await
    .expect("insert role")
}

async fn ensure_scope(db: &DatabaseConnection, key: &str) -> scope::Model {
    if let Some(found) = scope::Entity::find()
        .filter(scope::Column::Key.eq(key))
        .one(db)
        .await
        .expect("query scope")
    {
        return found;
    }
    scope::ActiveModel {
        id: Set(format!("scope-{key}")),
        key: Set(key.to_string()),
        description: Set(None),
    }
    .insert(db)
    .await
    .expect("insert scope")
}

/// Give `user_id` the capability (`role_key`, `scope_key`) within `institution_key`.
pub async fn grant(
    db: &DatabaseConnection,
    user_id: &str,
    institution_key: &str,
    role_key: &str,
    scope_key: &str,
) {
    let institution = ensure_institution(db, institution_key).await;
    let role = ensure_role(db, role_key).await;
    let scope = ensure_scope(db, scope_key).await;

    let capability = match capability::Entity::find()
        .filter(capability::Column::RoleId.eq(role.id.clone()))
        .filter(capability::Column::ScopeId.eq(scope.id.clone()))
        .one(db)
        .await
        .expect("query capability")
    {
        Some(found) => found,
        None => capability::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            role_id: Set(role.id),
            scope_id: Set(scope.id),
        }
        .insert(db)
        .await
        .expect("insert capability"),
    };

    let member = match member::Entity::find()
        .filter(member::Column::UserId.eq(user_id))
        .filter(member::Column::InstitutionId.eq(institution.id.clone()))
        .one(db)
        .await
        .expect("query member")
    {
        Some(found) => found,
        None => member::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            institution_id: Set(institution.id),
        }
        .insert(db)
        .await
        .expect("insert member"),
    };

    privilege::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        member_id: Set(member.id),
        capability_id: Set(capability.id),
    }
    .insert(db)
    .await
    .expect("insert privilege");
}
