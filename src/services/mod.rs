//! Service layer for business logic
//!
//! Shared by the HTTP handlers and the startup code.

mod click_service;

pub use click_service::*;
