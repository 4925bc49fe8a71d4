//! Signed, expiring tokens that carry a hub challenge through an out-of-band step
//! (a link sent by email) and back.
//!
//! The payload is readable by anyone holding the token; the HMAC only makes it
//! tamper-evident. Never put secrets in `params`.

use crate::error::TokenError;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// The out-of-band step a token was issued for. A token for one step is never accepted
/// by another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStep {
    VerifyEmail,
    ResetPassword,
}

impl TokenStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStep::VerifyEmail => "verify_email",
            TokenStep::ResetPassword => "reset_password",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChallengeClaims {
    chl: String,
    stp: String,
    #[serde(default)]
    prm: BTreeMap<String, String>,
    iat: i64,
    exp: i64,
}

/// A successfully decoded token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedChallenge {
    pub challenge: String,
    pub params: BTreeMap<String, String>,
}

impl DecodedChallenge {
    /// The hub challenge, if the step was started from within a hub flow.
    pub fn challenge(&self) -> Option<&str> {
        Some(self.challenge.as_str()).filter(|c| !c.is_empty())
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

#[derive(Clone)]
pub struct ChallengeTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    max_age: time::Duration,
}

impl ChallengeTokenCodec {
    pub fn new(secret: &[u8], max_age_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            max_age: time::Duration::seconds(max_age_secs),
        }
    }

    pub fn encode(
        &self,
        challenge: &str,
        step: TokenStep,
        params: BTreeMap<String, String>,
    ) -> Result<String, TokenError> {
        self.encode_at(challenge, step, params, OffsetDateTime::now_utc())
    }

    fn encode_at(
        &self,
        challenge: &str,
        step: TokenStep,
        params: BTreeMap<String, String>,
        issued_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let claims = ChallengeClaims {
            chl: challenge.to_string(),
            stp: step.as_str().to_string(),
            prm: params,
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + self.max_age).unix_timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    pub fn decode(&self, token: &str, expected: TokenStep) -> Result<DecodedChallenge, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<ChallengeClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        let claims = data.claims;
        if claims.stp != expected.as_str() {
            return Err(TokenError::StepMismatch {
                expected: expected.as_str().to_string(),
                found: claims.stp,
            });
        }
        Ok(DecodedChallenge {
            challenge: claims.chl,
            params: claims.prm,
        })
    }
}
