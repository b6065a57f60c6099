use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub locations: LocationsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4), cookie_secure: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
            run_migrations: true,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: String::new(), token_ttl_hours: default_token_ttl() }
    }
}

fn default_token_ttl() -> i64 { 12 }

/// Mercado Pago checkout settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default)]
    pub access_token: String,
    /// Empty disables webhook signature verification.
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default = "default_mp_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub notification_url: Option<String>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub failure_url: Option<String>,
    #[serde(default)]
    pub pending_url: Option<String>,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            webhook_secret: String::new(),
            api_base: default_mp_api_base(),
            notification_url: None,
            success_url: None,
            failure_url: None,
            pending_url: None,
            timeout_secs: default_gateway_timeout(),
        }
    }
}

fn default_mp_api_base() -> String { "https://api.mercadopago.com".into() }
fn default_gateway_timeout() -> u64 { 15 }

/// Government postal code and city lookup APIs.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationsConfig {
    #[serde(default = "default_viacep_base")]
    pub viacep_base: String,
    #[serde(default = "default_ibge_base")]
    pub ibge_base: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self {
            viacep_base: default_viacep_base(),
            ibge_base: default_ibge_base(),
            cache_ttl_secs: default_cache_ttl(),
            timeout_secs: default_gateway_timeout(),
        }
    }
}

fn default_viacep_base() -> String { "https://viacep.com.br".into() }
fn default_ibge_base() -> String { "https://servicodados.ibge.gov.br".into() }
fn default_cache_ttl() -> u64 { 86_400 }

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ChatConfig {
    fn default() -> Self { Self { channel_capacity: default_channel_capacity() } }
}

fn default_channel_capacity() -> usize { 256 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or start from defaults when missing), fill blanks from env, validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(_) => Self::from_env(),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Defaults with server binding taken from `SERVER_HOST`, `SERVER_PORT`, `TOKIO_WORKER_THREADS`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(host) = std::env::var("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            cfg.server.port = port;
        }
        if let Some(w) = std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok()) {
            cfg.server.worker_threads = Some(w);
        }
        cfg
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.auth.normalize_from_env();
        self.auth.validate()?;
        self.payments.normalize_from_env();
        if self.chat.channel_capacity == 0 {
            return Err(anyhow!("chat.channel_capacity must be >= 1"));
        }
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(w) if w > 0 => {}
            _ => self.worker_threads = Some(4),
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        if self.jwt_secret.trim().is_empty() {
            if let Ok(secret) = std::env::var("JWT_SECRET") {
                self.jwt_secret = secret;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < 16 {
            return Err(anyhow!("auth.jwt_secret must be at least 16 characters (config or JWT_SECRET)"));
        }
        if !(1..=24 * 30).contains(&self.token_ttl_hours) {
            return Err(anyhow!("auth.token_ttl_hours must be within 1..=720"));
        }
        Ok(())
    }
}

impl PaymentsConfig {
    pub fn normalize_from_env(&mut self) {
        if self.access_token.trim().is_empty() {
            if let Ok(token) = std::env::var("MERCADOPAGO_ACCESS_TOKEN") {
                self.access_token = token;
            }
        }
        if self.webhook_secret.trim().is_empty() {
            if let Ok(secret) = std::env::var("MERCADOPAGO_WEBHOOK_SECRET") {
                self.webhook_secret = secret;
            }
        }
        self.api_base = self.api_base.trim_end_matches('/').to_string();
    }
}
