//! Institutions, roles, scopes and the join tables that grant a user a role's
//! capabilities within an institution.
//!
//! - capabilities: (role, scope) pairs
//! - members: (user, institution) pairs
//! - privileges: (member, capability) pairs

use crate::m20261016_000001_create_users::Users;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Institutions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Institutions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Institutions::Key)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Institutions::Name).string().not_null())
                    .col(ColumnDef::new(Institutions::ParentId).string().null())
                    .col(ColumnDef::new(Institutions::RegistryId).string().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_institutions_parent")
                            .from(Institutions::Table, Institutions::ParentId)
                            .to(Institutions::Table, Institutions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Roles::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Roles::Key).string().not_null().unique_key())
                    .col(ColumnDef::new(Roles::Name).string().not_null())
                    .col(
                        ColumnDef::new(Roles::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Scopes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Scopes::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Scopes::Key).string().not_null().unique_key())
                    .col(ColumnDef::new(Scopes::Description).text().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Capabilities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Capabilities::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Capabilities::RoleId).string().not_null())
                    .col(ColumnDef::new(Capabilities::ScopeId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_capabilities_role")
                            .from(Capabilities::Table, Capabilities::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_capabilities_scope")
                            .from(Capabilities::Table, Capabilities::ScopeId)
                            .to(Scopes::Table, Scopes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Members::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Members::UserId).string().not_null())
                    .col(ColumnDef::new(Members::InstitutionId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_members_user")
                            .from(Members::Table, Members::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_members_institution")
                            .from(Members::Table, Members::InstitutionId)
                            .to(Institutions::Table, Institutions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Privileges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Privileges::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Privileges::MemberId).string().not_null())
                    .col(ColumnDef::new(Privileges::CapabilityId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_privileges_member")
                            .from(Privileges::Table, Privileges::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_privileges_capability")
                            .from(Privileges::Table, Privileges::CapabilityId)
                            .to(Capabilities::Table, Capabilities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The claims query walks members by user, then privileges by member.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_members_user_id")
                    .table(Members::Table)
                    .col(Members::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_privileges_member_id")
                    .table(Privileges::Table)
                    .col(Privileges::MemberId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_privileges_member_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_members_user_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Privileges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Capabilities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Scopes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Institutions::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Institutions {
    Table,
    Id,
    Key,
    Name,
    ParentId,
    RegistryId,
}

#[derive(DeriveIden)]
enum Roles {
    Table,
    Id,
    Key,
    Name,
    IsAdmin,
}

#[derive(DeriveIden)]
enum Scopes {
    Table,
    Id,
    Key,
    Description,
}

#[derive(DeriveIden)]
enum Capabilities {
    Table,
    Id,
    RoleId,
    ScopeId,
}

#[derive(DeriveIden)]
enum Members {
    Table,
    Id,
    UserId,
    InstitutionId,
}

#[derive(DeriveIden)]
enum Privileges {
    Table,
    Id,
    MemberId,
    CapabilityId,
}
