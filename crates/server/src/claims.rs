//! Token claim assembly from the privilege graph.

use crate::entity::user;
use crate::store::PrivilegeRepository;
use sea_orm::{DbErr, FromQueryResult};
use serde::{Deserialize, Serialize};

/// One (institution, role, scope) grant as embedded in the access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromQueryResult)]
pub struct Grant {
    pub institution_key: String,
    pub institution_name: String,
    pub role_key: String,
    pub role_name: String,
    pub scope_key: String,
}

/// Extended access-token claims.
///
/// `superuser == true` with empty `grants` means unrestricted access; consumers must
/// never read an empty grant list on its own as "no access".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub superuser: bool,
    pub grants: Vec<Grant>,
}

/// ID-token claims.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub email: String,
    pub email_verified: bool,
}

impl IdTokenClaims {
    pub fn for_user(user: &user::Model) -> Self {
        Self {
            email: user.email.clone(),
            email_verified: user.verified,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClaimsAssembler {
    privileges: PrivilegeRepository,
}

impl ClaimsAssembler {
    pub fn new(privileges: PrivilegeRepository) -> Self {
        Self { privileges }
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn assemble(
        &self,
        user: &user::Model,
        requested_scopes: &[String],
    ) -> Result<Claims, DbErr> {
        if user.superuser {
            return Ok(Claims {
                superuser: true,
                grants: Vec::new(),
            });
        }

        let grants = self.privileges.grants_for(&user.id, requested_scopes).await?;
        tracing::debug!(grants = grants.len(), "assembled access token claims");
        Ok(Claims {
            superuser: false,
            grants,
        })
    }
}
