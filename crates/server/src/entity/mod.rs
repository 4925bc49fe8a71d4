//! SeaORM entities for accounts and the privilege graph.
//!
//! A privilege joins a [`member`] (user at an institution) with a [`capability`]
//! (role within a scope); it is the unit projected into access-token claims.

pub mod capability;
pub mod institution;
pub mod member;
pub mod privilege;
pub mod role;
pub mod scope;
pub mod user;
