use crate::session::token::SessionSecret;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment name that turns on secure cookies by default
pub const PRODUCTION: &str = "production";

/// LINE Platform ID token verification endpoint
pub const DEFAULT_LINE_VERIFY_URL: &str = "https://api.line.me/oauth2/v2.1/verify";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct YomikikaseSettings {
    pub application: ApplicationSettings,
    pub session: SessionSettings,
    pub cookies: CookieSettings,
    pub admin: AdminSettings,
    pub line: LineSettings,
    pub logging: LoggingSettings,
    pub school_years: Vec<SchoolYearSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Externally visible origin; the config endpoint falls back to the request host
    pub public_base_url: Option<String>,
    pub cors_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionSettings {
    /// HMAC key for admin session tokens. Never generated: empty means
    /// authentication is unavailable.
    pub auth_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CookieSettings {
    /// Explicit override; otherwise secure exactly in production
    pub secure: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AdminSettings {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSettings {
    /// Channel ID, checked against the `aud` claim of verified ID tokens
    pub channel_id: String,
    pub liff_id: Option<String>,
    pub verify_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

/// School year seeded into the bundled store at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolYearSettings {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_active: bool,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: PRODUCTION.to_string(),
            public_base_url: None,
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
        }
    }
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            channel_id: String::new(),
            liff_id: None,
            verify_url: DEFAULT_LINE_VERIFY_URL.to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl YomikikaseSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - A settings file cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        Self::initialize_environment()?;

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Initialize environment variables and logging
    fn initialize_environment() -> anyhow::Result<()> {
        Self::load_env_file();
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `YOMIKIKASE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    fn load_base_settings() -> anyhow::Result<Self> {
        let mut settings = Self::default();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::load_from_path(default_config_path)?;
            log::info!("Loaded base settings from {}", default_config_path.display());
        }

        if let Ok(secrets_dir) = std::env::var("YOMIKIKASE_SECRETS_DIR") {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::load_from_path(&secrets_path)?;
                log::info!("Overriding settings from {}", secrets_path.display());
            } else {
                log::info!(
                    "YOMIKIKASE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid settings TOML.
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let toml_content = fs::read_to_string(path)?;
        let settings = basic_toml::from_str(&toml_content)?;
        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_admin_env_overrides(&mut settings.admin);
        Self::apply_line_env_overrides(&mut settings.line);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(environment) = std::env::var("APP_ENV") {
            app_settings.environment = environment;
        }
        if let Ok(public_base_url) = std::env::var("PUBLIC_BASE_URL") {
            app_settings.public_base_url = Some(public_base_url);
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    /// An empty `AUTH_SECRET` is ignored rather than treated as a value
    pub fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        if let Ok(secret) = std::env::var("AUTH_SECRET") {
            if !secret.is_empty() {
                session_settings.auth_secret = secret;
            }
        }
    }

    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        if let Ok(cookie_secure_str) = std::env::var("COOKIE_SECURE") {
            if let Ok(cookie_secure) = cookie_secure_str.parse::<bool>() {
                cookie_settings.secure = Some(cookie_secure);
            }
        }
    }

    fn apply_admin_env_overrides(admin_settings: &mut AdminSettings) {
        if let Ok(username) = std::env::var("ADMIN_USERNAME") {
            admin_settings.username = username;
        }
        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            admin_settings.password = password;
        }
    }

    fn apply_line_env_overrides(line_settings: &mut LineSettings) {
        if let Ok(channel_id) = std::env::var("LINE_CHANNEL_ID") {
            line_settings.channel_id = channel_id;
        }
        if let Ok(liff_id) = std::env::var("LIFF_ID") {
            line_settings.liff_id = Some(liff_id).filter(|id| !id.is_empty());
        }
        if let Ok(verify_url) = std::env::var("LINE_VERIFY_URL") {
            line_settings.verify_url = verify_url;
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// The shared session secret, or `None` when unset or unusable
    #[must_use]
    pub fn session_secret(&self) -> Option<SessionSecret> {
        SessionSecret::new(&self.session.auth_secret).ok()
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.application.environment == PRODUCTION
    }

    /// Effective `secure` flag for cookies
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookies.secure.unwrap_or_else(|| self.is_production())
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
