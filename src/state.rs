//! Shared application components
//!
//! Everything handlers and the edge gatekeeper read from actix app data is built
//! here once per process and cloned into each worker.

use crate::auth::AdminCredentials;
use crate::gatekeeper::EdgeGatekeeper;
use crate::handlers::configure_services;
use crate::line::{IdTokenVerifier, LineIdTokenVerifier};
use crate::session::{Clock, SessionManager};
use crate::settings::YomikikaseSettings;
use crate::store::{MemoryStore, SurveyStore};
use actix_web::web;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: YomikikaseSettings,
    pub session_manager: SessionManager,
    pub gatekeeper: EdgeGatekeeper,
    pub credentials: AdminCredentials,
    pub store: Arc<dyn SurveyStore>,
    pub verifier: Arc<dyn IdTokenVerifier>,
}

impl AppState {
    /// Build every component from settings with the bundled store and LINE verifier
    ///
    /// # Errors
    ///
    /// Returns an error if the LINE verify endpoint is not a valid URL.
    pub fn from_settings(settings: YomikikaseSettings) -> anyhow::Result<Self> {
        let verifier = LineIdTokenVerifier::from_settings(&settings.line)?;
        let store = MemoryStore::from_settings(&settings.school_years);
        Ok(Self::with_components(
            settings,
            Arc::new(store),
            Arc::new(verifier),
        ))
    }

    /// Build from settings with caller-supplied store and verifier
    #[must_use]
    pub fn with_components(
        settings: YomikikaseSettings,
        store: Arc<dyn SurveyStore>,
        verifier: Arc<dyn IdTokenVerifier>,
    ) -> Self {
        if settings.session_secret().is_none() {
            log::error!(
                "AUTH_SECRET is not configured; admin sign-in and protected pages are unavailable"
            );
        }

        Self {
            session_manager: SessionManager::from_settings(&settings),
            gatekeeper: EdgeGatekeeper::from_settings(&settings),
            credentials: AdminCredentials::from_settings(&settings.admin),
            settings,
            store,
            verifier,
        }
    }

    /// Drive both session checks from the same clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.session_manager = self.session_manager.with_clock(clock.clone());
        self.gatekeeper = self.gatekeeper.with_clock(clock);
        self
    }

    /// Register app data and routes
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.settings.clone()))
            .app_data(web::Data::new(self.session_manager.clone()))
            .app_data(web::Data::new(self.gatekeeper.clone()))
            .app_data(web::Data::new(self.credentials.clone()))
            .app_data(web::Data::from(self.store.clone()))
            .app_data(web::Data::from(self.verifier.clone()));
        configure_services(cfg);
    }
}
