//! Privilege lookups for claim assembly.

use crate::claims::Grant;
use crate::entity::{capability, institution, member, privilege, role, scope};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct PrivilegeRepository {
    db: Arc<DatabaseConnection>,
}

impl PrivilegeRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All privileges of `user_id` whose scope key is one of `scopes`, projected to grants.
    #[tracing::instrument(skip(self))]
    pub async fn grants_for(&self, user_id: &str, scopes: &[String]) -> Result<Vec<Grant>, DbErr> {
        if scopes.is_empty() {
            return Ok(Vec::new());
        }

        privilege::Entity::find()
            .select_only()
            .column_as(institution::Column::Key, "institution_key")
            .column_as(institution::Column::Name, "institution_name")
            .column_as(role::Column::Key, "role_key")
            .column_as(role::Column::Name, "role_name")
            .column_as(scope::Column::Key, "scope_key")
            .join(JoinType::InnerJoin, privilege::Relation::Member.def())
            .join(JoinType::InnerJoin, member::Relation::Institution.def())
            .join(JoinType::InnerJoin, privilege::Relation::Capability.def())
            .join(JoinType::InnerJoin, capability::Relation::Role.def())
            .join(JoinType::InnerJoin, capability::Relation::Scope.def())
            .filter(member::Column::UserId.eq(user_id))
            .filter(scope::Column::Key.is_in(scopes.iter().cloned()))
            .order_by_asc(institution::Column::Key)
            .order_by_asc(role::Column::Key)
            .order_by_asc(scope::Column::Key)
            .into_model::<Grant>()
            .all(self.db.as_ref())
            .await
    }
}
