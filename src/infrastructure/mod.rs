//! Infrastructure layer: concrete adapters for the domain contracts

pub mod api_key;
pub mod auth;
pub mod logging;
pub mod vqa;
