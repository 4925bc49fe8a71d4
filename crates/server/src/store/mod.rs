//! Typed repositories over the relational store.

pub mod privileges;
pub mod users;

pub use privileges::PrivilegeRepository;
pub use users::{UserRepository, normalize_email};
