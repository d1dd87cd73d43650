//! OAuth session lifecycle and token persistence.

pub mod error;
pub mod identity;
pub mod session;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use identity::{IdentityResolver, UserInfo};
pub use session::{OAuthConfig, SessionManager, SessionStatus};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::{TokenRecord, SESSION_TTL_MS};
