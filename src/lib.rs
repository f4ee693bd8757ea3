#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the yomikikase application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod auth;
pub mod error;
pub mod export;
pub mod gatekeeper;
pub mod handlers;
pub mod line;
pub mod models;
pub mod session;
pub mod settings;
pub mod state;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use error::AppError;
pub use gatekeeper::{edge_gatekeeper, EdgeGatekeeper};
pub use session::SessionManager;
pub use settings::YomikikaseSettings;
pub use state::AppState;
