//! Client for the hub's login/consent/logout admin API.

pub mod client;
pub mod types;

pub use client::HubAdminClient;
pub use types::{CompletedRequest, ConsentRequest, HubClient, LoginRequest, LogoutRequest};
