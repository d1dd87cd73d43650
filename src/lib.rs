//! Tycho — Google Workspace API gateway
//!
//! A small REST service that owns a single Google OAuth session and exposes
//! thin pass-throughs for Gmail, Calendar, and GA4. The interesting part is
//! the token lifecycle: an authorization code is exchanged once, access
//! tokens are refreshed lazily, and the one-time-issued refresh token plus
//! the application-level session expiry survive every refresh.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tycho::auth::{MemoryTokenStore, SessionManager};
//! use tycho::config::GatewayConfig;
//!
//! # async fn example() -> Result<(), tycho::auth::AuthError> {
//! let config = GatewayConfig::from_env().expect("config");
//! let sessions = SessionManager::new(config.oauth, Arc::new(MemoryTokenStore::new()));
//! let client = sessions.authenticated_client().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod google;
