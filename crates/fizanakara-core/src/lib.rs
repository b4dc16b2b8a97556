//! Core library for the Fizanakara administration console.
//!
//! Provides the authenticated REST client, session and credential storage,
//! domain models, a query cache invalidated on mutation, and the client-side
//! helpers (filtering, dashboard statistics, validation, formatting) used by
//! the front ends.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod console;
pub mod filter;
pub mod models;
pub mod stats;
pub mod utils;
pub mod validation;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialStore, Session, SessionStatus};
pub use config::Config;
pub use console::Console;
