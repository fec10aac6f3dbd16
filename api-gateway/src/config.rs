// ==============================================================================
// config.rs - Gateway Configuration
// ==============================================================================
// Description: Layered configuration (TOML file + environment overrides)
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment name used when `APP_ENV` is not set
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Signing secret used in development when none is configured
const DEVELOPMENT_JWT_SECRET: &str = "development-only-secret-change-me";

// ==============================================================================
// CONFIGURATION SECTIONS
// ==============================================================================

/// Complete gateway configuration, built once at startup
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Running environment name (from `APP_ENV`, not from the file)
    #[serde(skip)]
    pub environment: String,
    pub server: ServerConfig,
    #[serde(alias = "contentSecurityPolicy")]
    pub content_security_policy: CspConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub mailer: MailerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Mount the GraphQL explorer at `/api/docs`
    pub docs: bool,
    pub static_dir: PathBuf,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            docs: false,
            static_dir: PathBuf::from("public"),
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// Content-Security-Policy directives, keyed by directive name
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CspConfig {
    pub directives: BTreeMap<String, Vec<String>>,
}

impl Default for CspConfig {
    fn default() -> Self {
        let directives = [
            ("default-src", vec!["'self'"]),
            ("base-uri", vec!["'self'"]),
            ("font-src", vec!["'self'", "https:", "data:"]),
            ("form-action", vec!["'self'"]),
            ("frame-ancestors", vec!["'self'"]),
            ("img-src", vec!["'self'", "data:"]),
            ("object-src", vec!["'none'"]),
            ("script-src", vec!["'self'"]),
            ("script-src-attr", vec!["'none'"]),
            ("style-src", vec!["'self'", "https:", "'unsafe-inline'"]),
            ("upgrade-insecure-requests", vec![]),
        ]
        .into_iter()
        .map(|(name, values)| {
            (
                name.to_string(),
                values.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        Self { directives }
    }
}

impl CspConfig {
    /// Render the directives into a single header value
    ///
    /// Directives without values (e.g. `upgrade-insecure-requests`) render as
    /// the bare directive name.
    pub fn render(&self) -> Result<String> {
        if !self.directives.contains_key("default-src") {
            bail!("content security policy must define default-src");
        }

        let mut rendered = Vec::with_capacity(self.directives.len());
        for (name, values) in &self.directives {
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_lowercase() || b == b'-') {
                bail!("invalid CSP directive name {:?}", name);
            }
            if let Some(bad) = values.iter().find(|v| v.contains(';') || v.contains(',')) {
                bail!("invalid value {:?} for CSP directive {}", bad, name);
            }

            if values.is_empty() {
                rendered.push(name.clone());
            } else {
                rendered.push(format!("{} {}", name, values.join(" ")));
            }
        }

        Ok(rendered.join("; "))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// The single origin allowed to issue cross-origin requests
    pub allowed_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_ttl_hours: i64,
    /// Mark the session cookie `Secure` (enable behind TLS)
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            jwt_issuer: "platform-api-gateway".to_string(),
            token_ttl_hours: 24,
            cookie_secure: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailerConfig {
    /// SMTP relay host; mail is only logged when unset
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_use_tls: bool,
    pub from_email: String,
    pub from_name: String,
    /// Recipient of contact-form messages
    pub contact_inbox: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_use_tls: true,
            from_email: "no-reply@example.com".to_string(),
            from_name: "Platform".to_string(),
            contact_inbox: "support@example.com".to_string(),
        }
    }
}

// ==============================================================================
// LOADING
// ==============================================================================

impl AppConfig {
    /// Load configuration for the current process
    ///
    /// Reads `APP_ENV`, the matching TOML file (if any) and then applies
    /// environment variable overrides.
    pub fn load() -> Result<Self> {
        let environment =
            std::env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());

        let mut config = match Self::locate_file(&environment)? {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.environment = environment;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(contents)?;
        config.environment = DEFAULT_ENVIRONMENT.to_string();
        Ok(config)
    }

    /// `CONFIG_FILE` wins; otherwise `config/<env>.toml`, then `config/default.toml`
    fn locate_file(environment: &str) -> Result<Option<PathBuf>> {
        if let Ok(explicit) = std::env::var("CONFIG_FILE") {
            let path = PathBuf::from(explicit);
            if !path.exists() {
                bail!("CONFIG_FILE {} does not exist", path.display());
            }
            return Ok(Some(path));
        }

        let candidates = [
            PathBuf::from("config").join(format!("{}.toml", environment)),
            PathBuf::from("config").join("default.toml"),
        ];

        Ok(candidates.into_iter().find(|path| path.exists()))
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .context("PORT must be a valid port number")?;
        }
        if let Some(docs) = lookup("SERVER_DOCS") {
            self.server.docs = parse_flag(&docs).context("SERVER_DOCS must be true or false")?;
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }
        if let Some(origin) = lookup("CORS_ALLOWED_ORIGIN") {
            self.cors.allowed_origin = origin;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(issuer) = lookup("JWT_ISSUER") {
            self.auth.jwt_issuer = issuer;
        }
        if let Some(host) = lookup("SMTP_HOST") {
            self.mailer.smtp_host = Some(host);
        }
        if let Some(port) = lookup("SMTP_PORT") {
            self.mailer.smtp_port = port
                .parse()
                .context("SMTP_PORT must be a valid port number")?;
        }
        if let Some(use_tls) = lookup("SMTP_USE_TLS") {
            self.mailer.smtp_use_tls =
                parse_flag(&use_tls).context("SMTP_USE_TLS must be true or false")?;
        }
        if let Some(username) = lookup("SMTP_USERNAME") {
            self.mailer.smtp_username = Some(username);
        }
        if let Some(password) = lookup("SMTP_PASSWORD") {
            self.mailer.smtp_password = Some(password);
        }
        // File wins over the plain variable (mounted secrets)
        if let Some(password_file) = lookup("SMTP_PASSWORD_FILE") {
            let password = std::fs::read_to_string(&password_file)
                .with_context(|| format!("Failed to read SMTP password from {}", password_file))?;
            self.mailer.smtp_password = Some(password.trim().to_string());
        }

        Ok(())
    }

    /// Reject configurations that must never reach a running server
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret must not be empty");
        }
        if self.is_production() && self.auth.jwt_secret == DEVELOPMENT_JWT_SECRET {
            bail!("JWT_SECRET must be set in production");
        }
        if self.auth.token_ttl_hours <= 0 {
            bail!("auth.token_ttl_hours must be positive");
        }
        if self.server.body_limit_bytes == 0 {
            bail!("server.body_limit_bytes must be positive");
        }
        self.content_security_policy.render()?;

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognised flag value {:?}", other),
    }
}

// ==============================================================================
// TESTS
// ==============================================================================
