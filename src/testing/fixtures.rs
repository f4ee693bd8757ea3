//! Test fixtures providing pre-built components

use crate::models::SchoolYear;
use crate::session::{ManualClock, SessionManager, SessionSecret};
use crate::settings::YomikikaseSettings;
use crate::state::AppState;
use crate::store::MemoryStore;
use actix_web::cookie::Cookie;
use chrono::NaiveDate;
use std::sync::Arc;

use super::constants::{
    TEST_ADMIN_PASSWORD, TEST_ADMIN_USERNAME, TEST_CHANNEL_ID, TEST_NOW_MS, TEST_SECRET,
};
use super::mock::StubVerifier;

/// Central fixture provider
pub struct TestFixtures;

impl TestFixtures {
    /// Development settings with a secret and admin credentials
    #[must_use]
    pub fn settings() -> YomikikaseSettings {
        let mut settings = YomikikaseSettings::default();
        settings.application.environment = "development".to_string();
        settings.session.auth_secret = TEST_SECRET.to_string();
        settings.admin.username = TEST_ADMIN_USERNAME.to_string();
        settings.admin.password = TEST_ADMIN_PASSWORD.to_string();
        settings.line.channel_id = TEST_CHANNEL_ID.to_string();
        settings
    }

    /// Settings without a session secret
    #[must_use]
    pub fn settings_without_secret() -> YomikikaseSettings {
        let mut settings = Self::settings();
        settings.session.auth_secret = String::new();
        settings
    }

    /// # Panics
    ///
    /// Never; the test secret is non-empty.
    #[must_use]
    pub fn secret() -> SessionSecret {
        SessionSecret::new(TEST_SECRET).expect("test secret is valid")
    }

    #[must_use]
    pub fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(TEST_NOW_MS))
    }

    #[must_use]
    pub fn session_manager(clock: Arc<ManualClock>) -> SessionManager {
        SessionManager::from_settings(&Self::settings()).with_clock(clock)
    }

    /// Valid admin session cookie minted at the clock's current time
    ///
    /// # Panics
    ///
    /// Never; the fixture manager always has a secret.
    #[must_use]
    pub fn admin_cookie(clock: Arc<ManualClock>) -> Cookie<'static> {
        Self::session_manager(clock)
            .create_session()
            .expect("fixture manager has a secret")
    }

    /// Store holding one active school year
    pub async fn store() -> (Arc<MemoryStore>, SchoolYear) {
        let store = Arc::new(MemoryStore::new());
        let year = store
            .add_school_year(
                "2025年度",
                NaiveDate::from_ymd_opt(2025, 4, 1).unwrap_or_default(),
                NaiveDate::from_ymd_opt(2026, 3, 31).unwrap_or_default(),
                true,
            )
            .await;
        (store, year)
    }

    /// Fully wired state on a manual clock
    #[must_use]
    pub fn state(
        store: Arc<MemoryStore>,
        verifier: StubVerifier,
        clock: Arc<ManualClock>,
    ) -> AppState {
        AppState::with_components(Self::settings(), store, Arc::new(verifier)).with_clock(clock)
    }
}
