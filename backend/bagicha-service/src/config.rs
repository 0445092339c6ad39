use crate::error::AppError;
use dotenvy::dotenv;
use std::env;

/// Origins always allowed by CORS, in addition to `CLIENT_URL`.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://bagichalink.netlify.app",
    "http://localhost:8080",
    "http://localhost:3000",
    "http://localhost:5173",
];

#[derive(Debug, Clone)]
pub struct AiProviderConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WsConfig {
    pub heartbeat_secs: u64,
    pub client_timeout_secs: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: 5,
            client_timeout_secs: 30,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expires_in_days: i64,
    pub client_url: Option<String>,
    pub app_env: String,
    pub self_ping_url: Option<String>,
    pub ai_providers: Vec<AiProviderConfig>,
    pub ws: WsConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expires_in_days", &self.jwt_expires_in_days)
            .field("client_url", &self.client_url)
            .field("app_env", &self.app_env)
            .field("self_ping_url", &self.self_ping_url)
            .field(
                "ai_providers",
                &self.ai_providers.iter().map(|p| &p.name).collect::<Vec<_>>(),
            )
            .field("ws", &self.ws)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| AppError::Config("JWT_SECRET missing".into()))?;
        if jwt_secret.trim().is_empty() {
            return Err(AppError::Config("JWT_SECRET must not be empty".into()));
        }

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);
        let jwt_expires_in_days = env::var("JWT_EXPIRES_IN_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|days: &i64| *days > 0)
            .unwrap_or(crypto_core::jwt::DEFAULT_TOKEN_EXPIRY_DAYS);

        let client_url = non_empty_var("CLIENT_URL");
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let self_ping_url = non_empty_var("SELF_PING_URL");

        let ai_providers = env::var("AI_PROVIDERS")
            .map(|value| {
                Self::parse_ai_providers(&value, |name| {
                    non_empty_var(&format!("AI_API_KEY_{}", name.to_ascii_uppercase()))
                })
            })
            .unwrap_or_default();

        let defaults = WsConfig::default();
        let ws = WsConfig {
            heartbeat_secs: env::var("WS_HEARTBEAT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.heartbeat_secs),
            client_timeout_secs: env::var("WS_CLIENT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.client_timeout_secs),
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_expires_in_days,
            client_url,
            app_env,
            self_ping_url,
            ai_providers,
            ws,
        })
    }

    /// Parse `name=base_url` pairs separated by commas. Entries without a
    /// name or URL are skipped.
    pub fn parse_ai_providers(
        value: &str,
        api_key: impl Fn(&str) -> Option<String>,
    ) -> Vec<AiProviderConfig> {
        value
            .split(',')
            .map(str::trim)
            .filter_map(|entry| entry.split_once('='))
            .map(|(name, url)| (name.trim(), url.trim().trim_end_matches('/')))
            .filter(|(name, url)| !name.is_empty() && !url.is_empty())
            .map(|(name, url)| AiProviderConfig {
                name: name.to_string(),
                base_url: url.to_string(),
                api_key: api_key(name),
            })
            .collect()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(url) = &self.client_url {
            let url = url.trim_end_matches('/').to_string();
            if !origins.contains(&url) {
                origins.push(url);
            }
        }
        origins
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Config used by tests and tooling that never reads the environment.
    pub fn for_tests(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "test-secret".into(),
            jwt_expires_in_days: crypto_core::jwt::DEFAULT_TOKEN_EXPIRY_DAYS,
            client_url: None,
            app_env: "test".into(),
            self_ping_url: None,
            ai_providers: Vec::new(),
            ws: WsConfig::default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ai_providers() {
        let providers = Config::parse_ai_providers(
            "primary=https://ai.example.com/, backup = http://localhost:9000 ,broken,=x",
            |name| (name == "primary").then(|| "key-1".to_string()),
        );

        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].name, "primary");
        assert_eq!(providers[0].base_url, "https://ai.example.com");
        assert_eq!(providers[0].api_key.as_deref(), Some("key-1"));
        assert_eq!(providers[1].name, "backup");
        assert_eq!(providers[1].base_url, "http://localhost:9000");
        assert!(providers[1].api_key.is_none());
    }

    #[test]
    fn test_allowed_origins_include_client_url_once() {
        let mut config = Config::for_tests("postgres://localhost/test");
        config.client_url = Some("https://my.garden.app/".into());
        let origins = config.allowed_origins();
        assert_eq!(origins.len(), DEFAULT_ALLOWED_ORIGINS.len() + 1);
        assert!(origins.contains(&"https://my.garden.app".to_string()));

        config.client_url = Some("http://localhost:3000".into());
        assert_eq!(config.allowed_origins().len(), DEFAULT_ALLOWED_ORIGINS.len());
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env() {
        let keys = [
            "DATABASE_URL",
            "JWT_SECRET",
            "PORT",
            "APP_ENV",
            "AI_PROVIDERS",
            "AI_API_KEY_PRIMARY",
            "WS_HEARTBEAT_SECS",
        ];
        env::set_var("DATABASE_URL", "postgres://localhost/bagicha");
        env::set_var("JWT_SECRET", "s3cret");
        env::set_var("PORT", "8081");
        env::set_var("APP_ENV", "Production");
        env::set_var("AI_PROVIDERS", "primary=https://ai.example.com");
        env::set_var("AI_API_KEY_PRIMARY", "k");
        env::set_var("WS_HEARTBEAT_SECS", "not-a-number");

        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 8081);
        assert!(config.is_production());
        assert_eq!(config.ai_providers[0].api_key.as_deref(), Some("k"));
        assert_eq!(config.ws.heartbeat_secs, WsConfig::default().heartbeat_secs);

        env::set_var("JWT_SECRET", "  ");
        assert!(matches!(Config::from_env(), Err(AppError::Config(_))));

        for key in keys {
            env::remove_var(key);
        }
        assert!(matches!(Config::from_env(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::for_tests("postgres://u:pw@db/app");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("pw@db"));
        assert!(!rendered.contains("test-secret"));
    }
}
