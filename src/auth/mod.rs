//! Admin authentication
//!
//! A single administrator is configured through settings. Successful login mints a
//! stateless session (see [`crate::session`]).

pub mod credentials;

pub use credentials::AdminCredentials;
