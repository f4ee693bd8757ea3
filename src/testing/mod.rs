//! Testing utilities
//!
//! Compiled for unit tests and behind the `testing` feature.
//!
//! - [`fixtures`] - Settings, clocks and a fully wired [`crate::AppState`]
//! - [`mock`] - Stub LINE ID token verifier
//!
//! ```rust,ignore
//! use yomikikase::testing::{fixtures::TestFixtures, mock::StubVerifier};
//!
//! let clock = TestFixtures::clock();
//! let verifier = StubVerifier::new().with_user("token-1", "U1", Some("Taro"));
//! let state = TestFixtures::state(store, verifier, clock);
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::StubVerifier;

/// Common test constants
pub mod constants {
    /// Shared HMAC secret
    pub const TEST_SECRET: &str = "test-auth-secret-for-unit-tests";

    pub const TEST_ADMIN_USERNAME: &str = "admin";

    pub const TEST_ADMIN_PASSWORD: &str = "correct horse battery staple";

    /// LINE channel the stub verifier pretends to serve
    pub const TEST_CHANNEL_ID: &str = "1234567890";

    /// Fixed "now" for manual clocks (2023-11-14T22:13:20Z)
    pub const TEST_NOW_MS: i64 = 1_700_000_000_000;
}
