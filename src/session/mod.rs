//! Session Management Module
//!
//! Stateless admin sessions: the client cookie is the only storage.
//!
//! # Modules
//!
//! - [`token`] - Token format, minting and verification (shared by every call site)
//! - [`clock`] - Injectable time source
//! - [`cookie`] - Cookie attributes and helpers
//! - [`manager`] - Handler-side session manager

pub mod clock;
pub mod cookie;
pub mod manager;
pub mod token;

// Re-export commonly used items for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use cookie::{create_expired_cookie, CookieFactory, CookieOptions, COOKIE_NAME};
pub use manager::SessionManager;
pub use token::{ConfigError, SessionSecret, SESSION_MAX_AGE_MS, SESSION_MAX_AGE_SECONDS};
