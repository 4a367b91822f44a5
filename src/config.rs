/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, CORS 許可、メール、トークン設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - メール設定だけは任意 (送信時に不足を報告する)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// SMTP relay settings. Every field is optional so the service can boot
/// without a relay; sending reports what is missing.
#[derive(Clone, Default)]
pub struct MailSettings {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
}

impl MailSettings {
    /// Names of the relay variables that are not set.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.host.is_none() {
            missing.push("EMAIL_HOST");
        }
        if self.user.is_none() {
            missing.push("EMAIL_USER");
        }
        if self.pass.is_none() {
            missing.push("EMAIL_PASS");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the password
        f.debug_struct("MailSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Public base URLs embedded in emails.
#[derive(Debug, Clone)]
pub struct PublicUrls {
    pub backend: String,
    pub frontend: String,
}

pub const MAX_SESSION_TTL_SECONDS: u64 = 30 * 24 * 3600;
pub const MAX_APPROVAL_TTL_HOURS: u64 = 365 * 24;

pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub redis_url: Option<String>,

    pub app_env: AppEnv,
    pub urls: PublicUrls,
    pub cors_allowed_origins: Vec<String>,

    pub jwt_secret: String,
    pub session_token_ttl_seconds: u64,
    pub approval_token_secret: String,
    pub approval_token_ttl_hours: u64,

    pub mail: MailSettings,
    pub template_dir: Option<PathBuf>,
    pub static_client_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = parse_var("PORT", 8000)?;

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let redis_url = non_empty_var("REDIS_URL");

        let app_env = AppEnv::from_env();

        let backend = non_empty_var("BACKEND_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_string());
        let frontend = non_empty_var("FRONTEND_URL")
            .unwrap_or_else(|| "http://localhost:5173".to_string());
        let urls = PublicUrls {
            backend: normalize_base_url(&backend).ok_or(ConfigError::Invalid("BACKEND_URL"))?,
            frontend: normalize_base_url(&frontend).ok_or(ConfigError::Invalid("FRONTEND_URL"))?,
        };

        let cors_allowed_origins =
            split_origins(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        let jwt_secret = non_empty_var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let session_token_ttl_seconds: u64 = parse_var("SESSION_TOKEN_TTL_SECONDS", 86_400)?; // 24 h
        if !(1..=MAX_SESSION_TTL_SECONDS).contains(&session_token_ttl_seconds) {
            return Err(ConfigError::Invalid("SESSION_TOKEN_TTL_SECONDS"));
        }

        let approval_token_secret =
            non_empty_var("APPROVAL_TOKEN_SECRET").unwrap_or_else(|| jwt_secret.clone());

        let approval_token_ttl_hours: u64 = parse_var("APPROVAL_TOKEN_TTL_HOURS", 24)?;
        if !(1..=MAX_APPROVAL_TTL_HOURS).contains(&approval_token_ttl_hours) {
            return Err(ConfigError::Invalid("APPROVAL_TOKEN_TTL_HOURS"));
        }

        let mail = MailSettings {
            host: non_empty_var("EMAIL_HOST"),
            port: parse_var("EMAIL_PORT", 587)?,
            user: non_empty_var("EMAIL_USER"),
            pass: non_empty_var("EMAIL_PASS"),
        };

        let template_dir = non_empty_var("TEMPLATE_DIR").map(PathBuf::from);

        let static_client_dir = non_empty_var("STATIC_CLIENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("static/client"));

        Ok(Self {
            addr,
            database_url,
            redis_url,
            app_env,
            urls,
            cors_allowed_origins,
            jwt_secret,
            session_token_ttl_seconds,
            approval_token_secret,
            approval_token_ttl_hours,
            mail,
            template_dir,
            static_client_dir,
        })
    }
}

const DEV_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

// Gmail / AMP for Email playground origins that submit AMP forms.
const AMP_ORIGINS: [&str; 5] = [
    "https://mail.google.com",
    "https://gmail.com",
    "https://amp.gmail.dev",
    "https://accounts.google.com",
    "https://googlemail.com",
];

impl Config {
    /// Every origin allowed by CORS, in order, without duplicates.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let candidates = DEV_ORIGINS
            .iter()
            .map(|s| s.to_string())
            .chain([self.urls.frontend.clone(), self.urls.backend.clone()])
            .chain(AMP_ORIGINS.iter().map(|s| s.to_string()))
            .chain(self.cors_allowed_origins.iter().cloned());
        for origin in candidates {
            let origin = origin.trim_end_matches('/').to_string();
            if !out.contains(&origin) {
                out.push(origin);
            }
        }
        out
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_url: "postgres://localhost/leave_approval_test".into(),
        redis_url: None,
        app_env: AppEnv::Development,
        urls: PublicUrls {
            backend: "https://api.example.com".into(),
            frontend: "https://app.example.com".into(),
        },
        cors_allowed_origins: vec!["https://partner.example.com".into()],
        jwt_secret: "session-secret".into(),
        session_token_ttl_seconds: 3600,
        approval_token_secret: "approval-secret".into(),
        approval_token_ttl_hours: 24,
        mail: MailSettings {
            port: 587,
            ..MailSettings::default()
        },
        template_dir: None,
        static_client_dir: PathBuf::from("static/client"),
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Unset means the default; set but unparsable is an error.
fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Must be an absolute http(s) URL; trailing slash removed so links can be joined with "/api/...".
fn normalize_base_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    Some(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_env_accepts_short_production_name() {
        assert!(AppEnv::parse("PROD").is_production());
        assert!(AppEnv::parse("production").is_production());
        assert!(!AppEnv::parse("staging").is_production());
    }

    #[test]
    fn mail_settings_report_every_missing_key() {
        let settings = MailSettings {
            host: Some("smtp.example.com".into()),
            port: 587,
            user: None,
            pass: None,
        };
        assert_eq!(settings.missing(), vec!["EMAIL_USER", "EMAIL_PASS"]);
        assert!(!settings.is_complete());
    }

    #[test]
    fn mail_settings_debug_hides_password() {
        let settings = MailSettings {
            host: None,
            port: 587,
            user: Some("bot@example.com".into()),
            pass: Some("hunter2".into()),
        };
        let printed = format!("{settings:?}");
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            normalize_base_url("https://api.example.com/").as_deref(),
            Some("https://api.example.com")
        );
        assert!(normalize_base_url("ftp://example.com").is_none());
        assert!(normalize_base_url("not a url").is_none());
    }

    #[test]
    fn allowed_origins_merge_without_duplicates() {
        let mut config = test_config();
        config.cors_allowed_origins = vec![
            "http://localhost:5173".into(),
            "https://partner.example.com/".into(),
        ];

        let origins = config.allowed_origins();
        assert_eq!(origins.iter().filter(|o| *o == "http://localhost:5173").count(), 1);
        assert!(origins.contains(&"https://app.example.com".to_string()));
        assert!(origins.contains(&"https://mail.google.com".to_string()));
        assert_eq!(origins.last().map(String::as_str), Some("https://partner.example.com"));
    }

    // from_env reads the process environment; these tests hold the lock.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    const KEYS: [&str; 6] = [
        "DATABASE_URL",
        "JWT_SECRET",
        "PORT",
        "EMAIL_PORT",
        "SESSION_TOKEN_TTL_SECONDS",
        "APPROVAL_TOKEN_TTL_HOURS",
    ];

    fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        // SAFETY: every test touching the environment runs under ENV_LOCK.
        unsafe {
            for key in KEYS {
                std::env::remove_var(key);
            }
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
        }
        let out = f();
        unsafe {
            for key in KEYS {
                std::env::remove_var(key);
            }
        }
        out
    }

    const BASE: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/leave"),
        ("JWT_SECRET", "secret"),
    ];

    fn invalid_key(err: ConfigError) -> &'static str {
        match err {
            ConfigError::Invalid(key) => key,
            other => panic!("expected Invalid, got {other}"),
        }
    }

    #[test]
    fn from_env_applies_defaults() {
        let config = with_env(&BASE, Config::from_env).unwrap();
        assert_eq!(config.addr.port(), 8000);
        assert_eq!(config.session_token_ttl_seconds, 86_400);
        assert_eq!(config.approval_token_ttl_hours, 24);
        assert_eq!(config.mail.port, 587);
    }

    #[test]
    fn from_env_requires_database_url_and_jwt_secret() {
        let err = with_env(&[("JWT_SECRET", "secret")], Config::from_env).err().unwrap();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));

        let err = with_env(&[("DATABASE_URL", "postgres://localhost/leave")], Config::from_env)
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn from_env_rejects_unparsable_numbers() {
        for (key, value) in [
            ("PORT", "not-a-port"),
            ("EMAIL_PORT", "70000"),
            ("SESSION_TOKEN_TTL_SECONDS", "-5"),
            ("APPROVAL_TOKEN_TTL_HOURS", "twenty-four"),
        ] {
            let mut vars = BASE.to_vec();
            vars.push((key, value));
            let err = with_env(&vars, Config::from_env).err().unwrap();
            assert_eq!(invalid_key(err), key);
        }
    }

    #[test]
    fn from_env_bounds_token_lifetimes() {
        for (key, value) in [
            ("SESSION_TOKEN_TTL_SECONDS", "0"),
            ("APPROVAL_TOKEN_TTL_HOURS", "0"),
            ("APPROVAL_TOKEN_TTL_HOURS", "10000000000000000000"),
            ("SESSION_TOKEN_TTL_SECONDS", "9223372036854775807"),
        ] {
            let mut vars = BASE.to_vec();
            vars.push((key, value));
            let err = with_env(&vars, Config::from_env).err().unwrap();
            assert_eq!(invalid_key(err), key);
        }
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            split_origins(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }
}
