//! Service layer between handlers and `oasis_core`.

pub mod auth;
