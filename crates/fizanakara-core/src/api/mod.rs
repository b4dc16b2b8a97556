//! REST API client module for the Fizanakara backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! registry API: session and administrator accounts, members, annual
//! contributions, payments, districts and tributes.
//!
//! Requests carry a JWT bearer token from the `Session`. An expired access
//! token is refreshed once per request; when that fails the session ends
//! and the user is sent back to the login screen.

pub mod admins;
pub mod client;
pub mod contributions;
pub mod error;
pub mod locations;
pub mod members;
pub mod payments;

pub use client::ApiClient;
pub use error::{api_error, user_message, ApiError};
