//! Credential checks against the account store.
//!
//! [`CredentialValidator`] runs the account-state chain in a fixed order
//! (existence, lock, password, disabled, verified). The order is part of the contract:
//! the lock check precedes password verification so a locked account answers the same
//! way whatever password is offered.

pub mod password;
pub mod policy;
pub mod validator;

pub use password::{PasswordHashing, password_fingerprint};
pub use policy::{PasswordPolicy, StandardPasswordPolicy, is_plausible_email};
pub use validator::CredentialValidator;
