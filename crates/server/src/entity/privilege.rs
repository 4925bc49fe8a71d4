//! Privilege entity - a member holding a capability, i.e. (institution, user, role, scope).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "privileges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub member_id: String,
    pub capability_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MemberId",
        to = "super::member::Column::Id"
    )]
    Member,
    #[sea_orm(
        belongs_to = "super::capability::Entity",
        from = "Column::CapabilityId",
        to = "super::capability::Column::Id"
    )]
    Capability,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::capability::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Capability.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
