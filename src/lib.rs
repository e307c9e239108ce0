//! IS23 ImouRelay Library
//!
//! Credential-shielding relay in front of the Imou OpenAPI.
//!
//! ## Architecture (4 Components)
//!
//! 1. ImouClient - signed vendor calls (token / stream / device list)
//! 2. Signer - canonical-string MD5 signing (inside imou_client)
//! 3. WebAPI - REST endpoints the frontend calls
//! 4. AppState/Config - env-loaded credential and server settings
//!
//! ## Design Principles
//!
//! - The app secret never leaves this process; the frontend only ever
//!   holds vendor access tokens
//! - One signing pipeline for every operation; no per-operation forks
//! - Stateless per request; the only shared state is immutable config

pub mod error;
pub mod imou_client;
pub mod models;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
