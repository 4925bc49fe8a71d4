//! Institution entity - a node in a forest of organisations.
//!
//! Root institutions hang off a registry; child institutions inherit theirs through the
//! parent chain, so exactly one of `parent_id` and `registry_id` is set.

use sea_orm::ActiveValue;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "institutions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub key: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub registry_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
}

/// Enforce the registry/parent exclusivity for a prospective row.
pub fn check_registry_link(
    parent_id: Option<&str>,
    registry_id: Option<&str>,
) -> Result<(), DbErr> {
    match (parent_id, registry_id) {
        (None, Some(_)) | (Some(_), None) => Ok(()),
        (None, None) => Err(DbErr::Custom(
            "root institution must reference a registry".into(),
        )),
        (Some(_), Some(_)) => Err(DbErr::Custom(
            "child institution must not reference a registry".into(),
        )),
    }
}

/// The value a save will leave in the column: the active value if present, else the stored one.
fn resolved<'a>(
    value: &'a ActiveValue<Option<String>>,
    stored: Option<&'a Option<String>>,
) -> Option<&'a str> {
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => v.as_deref(),
        ActiveValue::NotSet => stored.and_then(|v| v.as_deref()),
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let partial = self.parent_id.is_not_set() || self.registry_id.is_not_set();
        let stored = match self.id.clone() {
            ActiveValue::Set(id) | ActiveValue::Unchanged(id) if partial && !insert => {
                Entity::find_by_id(id).one(db).await?
            }
            _ => None,
        };
        check_registry_link(
            resolved(&self.parent_id, stored.as_ref().map(|m| &m.parent_id)),
            resolved(&self.registry_id, stored.as_ref().map(|m| &m.registry_id)),
        )?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_and_parent_are_mutually_exclusive() {
        assert!(check_registry_link(None, Some("registry")).is_ok());
        assert!(check_registry_link(Some("parent"), None).is_ok());
        assert!(check_registry_link(None, None).is_err());
        assert!(check_registry_link(Some("parent"), Some("registry")).is_err());
    }
}
