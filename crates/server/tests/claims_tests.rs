//! Claim assembly from the privilege graph.

mod common;

use common::{NewUser, create_test_state, grant, insert_user};
use idp_bridge::claims::IdTokenClaims;
use idp_bridge::entity::institution;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ActiveValue::Unchanged, EntityTrait};

const UNUSED_HUB: &str = "http://127.0.0.1:9";

fn scopes(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

#[tokio::test]
async fn superuser_gets_no_grants_whatever_the_scopes() {
    let (state, resources) = create_test_state(UNUSED_HUB).await;
    let admin = insert_user(
        &resources.db,
        NewUser {
            superuser: true,
            ..NewUser::new("root@example.org")
        },
    )
    .await;
    grant(&resources.db, &admin.id, "uni", "editor", "A").await;

    for requested in [scopes(&[]), scopes(&["A"]), scopes(&["A", "B", "Z"])] {
        let claims = state
            .claims
            .assemble(&admin, &requested)
            .await
            .expect("assemble");
        assert!(claims.superuser);
        assert!(claims.grants.is_empty());
    }
}

#[tokio::test]
async fn only_requested_scopes_are_granted() {
    let (state, resources) = create_test_state(UNUSED_HUB).await;
    let account = insert_user(&resources.db, NewUser::new("ada@example.org")).await;
    grant(&resources.db, &account.id, "uni", "editor", "A").await;
    grant(&resources.db, &account.id, "uni", "editor", "B").await;

    let claims = state
        .claims
        .assemble(&account, &scopes(&["A"]))
        .await
        .expect("assemble");
    assert!(!claims.superuser);
    assert_eq!(claims.grants.len(), 1);
    let only = &claims.grants[0];
    assert_eq!(only.scope_key, "A");
    assert_eq!(only.institution_key, "uni");
    assert_eq!(only.institution_name, "Institution uni");
    assert_eq!(only.role_key, "editor");
    assert_eq!(only.role_name, "Role editor");
}

#[tokio::test]
async fn grants_are_ordered_and_scoped_to_the_user() {
    let (state, resources) = create_test_state(UNUSED_HUB).await;
    let account = insert_user(&resources.db, NewUser::new("ada@example.org")).await;
    let other = insert_user(&resources.db, NewUser::new("bob@example.org")).await;
    grant(&resources.db, &account.id, "zoo", "viewer", "A").await;
    grant(&resources.db, &account.id, "abbey", "viewer", "B").await;
    grant(&resources.db, &account.id, "abbey", "editor", "A").await;
    grant(&resources.db, &other.id, "abbey", "owner", "A").await;

    let claims = state
        .claims
        .assemble(&account, &scopes(&["B", "A"]))
        .await
        .expect("assemble");
    let order: Vec<_> = claims
        .grants
        .iter()
        .map(|g| (g.institution_key.as_str(), g.role_key.as_str(), g.scope_key.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("abbey", "editor", "A"),
            ("abbey", "viewer", "B"),
            ("zoo", "viewer", "A"),
        ]
    );
}

#[tokio::test]
async fn no_requested_scopes_means_no_grants() {
    let (state, resources) = create_test_state(UNUSED_HUB).await;
    let account = insert_user(&resources.db, NewUser::new("ada@example.org")).await;
    grant(&resources.db, &account.id, "uni", "editor", "A").await;

    let claims = state
        .claims
        .assemble(&account, &[])
        .await
        .expect("assemble");
    assert!(!claims.superuser);
    assert!(claims.grants.is_empty());
}

#[tokio::test]
async fn id_token_claims_mirror_the_account() {
    let (_state, resources) = create_test_state(UNUSED_HUB).await;
    let account = insert_user(&resources.db, NewUser::new("ada@example.org")).await;
    let id_token = IdTokenClaims::for_user(&account);
    assert_eq!(id_token.email, "ada@example.org");
    assert!(id_token.email_verified);
    assert_eq!(
        serde_json::to_value(&id_token).expect("json"),
        serde_json::json!({"email": "ada@example.org", "email_verified": true})
    );
}

#[tokio::test]
async fn partial_institution_update_keeps_registry_link() {
    let (_state, resources) = create_test_state(UNUSED_HUB).await;
    let account = insert_user(&resources.db, NewUser::new("ada@example.org")).await;
    grant(&resources.db, &account.id, "uni", "editor", "A").await;
    let stored = institution::Entity::find_by_id("inst-uni".to_string())
        .one(resources.db.as_ref())
        .await
        .expect("query")
        .expect("institution seeded");

    let renamed = institution::ActiveModel {
        id: Unchanged(stored.id.clone()),
        name: Set("University".to_string()),
        ..Default::default()
    }
    .update(resources.db.as_ref())
    .await
    .expect("rename without touching the links");
    assert_eq!(renamed.name, "University");
    assert_eq!(renamed.registry_id, stored.registry_id);

    // A root that keeps its registry cannot also gain a parent.
    let err = institution::ActiveModel {
        id: Unchanged(stored.id.clone()),
        parent_id: Set(Some(stored.id.clone())),
        ..Default::default()
    }
    .update(resources.db.as_ref())
    .await
    .expect_err("registry and parent together");
    assert!(err.to_string().contains("must not reference a registry"));
}
