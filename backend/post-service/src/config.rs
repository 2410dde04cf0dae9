/// Configuration management for Post Service
///
/// This module loads configuration from environment variables. `main` calls
/// `dotenvy::dotenv()` first, so a local `.env` file works as well.
use db_pool::DbConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_MEDIA_FOLDER: &str = "SocialixWebApp/Posts";

/// Media part size limit when `MEDIA_MAX_UPLOAD_BYTES` is unset
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Media store configuration; `None` disables uploads
    pub media: Option<MediaConfig>,
    /// Bearer token verification
    pub auth: AuthConfig,
    /// Feed listing configuration
    pub feed: FeedConfig,
    /// Reference sweeper configuration
    pub sweeper: SweeperConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Which store backs the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// Process-local, lost on restart
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Store backend (`STORE_BACKEND`), PostgreSQL unless set to `memory`
    pub backend: StoreBackend,
    /// Database URL
    pub url: String,
}

impl DatabaseConfig {
    /// Pool settings for `url`, tuned by the `DB_*` variables `db_pool` reads
    pub fn pool_config(&self) -> Result<DbConfig, String> {
        DbConfig::from_env_with_url("post-service", self.url.clone())
    }
}

/// Cloudinary credentials and upload limits
#[derive(Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    /// Folder new post media is stored under
    pub folder: String,
    /// Largest accepted media part, in bytes
    pub max_upload_bytes: usize,
    pub request_timeout_ms: u64,
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// Bearer token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// RS256 public key (PEM) used to verify access tokens
    pub jwt_public_key_pem: Option<String>,
}

/// Feed listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub page_size: i64,
}

/// Reference sweeper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between sweeps; 0 disables the job
    pub interval_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { page_size: 3 }
    }
}

impl Config {
    /// Folder post media is uploaded to
    pub fn media_folder(&self) -> &str {
        self.media
            .as_ref()
            .map(|m| m.folder.as_str())
            .unwrap_or(DEFAULT_MEDIA_FOLDER)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.media
            .as_ref()
            .map(|m| m.max_upload_bytes)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let cors = {
            let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                Ok(value) => value,
                Err(_) if production => {
                    return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                }
                Err(_) => "http://localhost:3000".to_string(),
            };

            if production && allowed_origins.trim() == "*" {
                return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
            }

            CorsConfig { allowed_origins }
        };

        let auth = AuthConfig {
            jwt_public_key_pem: load_jwt_public_key()?,
        };
        if production && auth.jwt_public_key_pem.is_none() {
            return Err("JWT_PUBLIC_KEY_PEM or JWT_PUBLIC_KEY_FILE must be set in production".to_string());
        }

        let page_size = parse_env_or_default("FEED_PAGE_SIZE", FeedConfig::default().page_size)?;
        if page_size <= 0 {
            return Err(format!("FEED_PAGE_SIZE must be positive, got {}", page_size));
        }

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("POST_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("POST_SERVICE_PORT")
                    .or_else(|_| std::env::var("PORT"))
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(3000),
            },
            cors,
            database: DatabaseConfig {
                backend: parse_env_or_default("STORE_BACKEND", StoreBackend::Postgres)?,
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/socialix".to_string()),
            },
            media: parse_media_config()?,
            auth,
            feed: FeedConfig { page_size },
            sweeper: SweeperConfig {
                interval_secs: parse_env_or_default("SWEEP_INTERVAL_SECS", 3600)?,
            },
        })
    }
}

fn load_jwt_public_key() -> Result<Option<String>, String> {
    if let Ok(pem) = std::env::var("JWT_PUBLIC_KEY_PEM") {
        return Ok(Some(pem));
    }
    match std::env::var("JWT_PUBLIC_KEY_FILE") {
        Ok(path) => std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| format!("Failed to read JWT_PUBLIC_KEY_FILE '{}': {}", path, e)),
        Err(_) => Ok(None),
    }
}

fn parse_media_config() -> Result<Option<MediaConfig>, String> {
    let cloud_name = match std::env::var("CLOUDINARY_CLOUD_NAME") {
        Ok(name) if !name.trim().is_empty() => name,
        _ => return Ok(None),
    };

    let api_key = std::env::var("CLOUDINARY_API_KEY")
        .map_err(|_| "CLOUDINARY_API_KEY must be set with CLOUDINARY_CLOUD_NAME".to_string())?;
    let api_secret = std::env::var("CLOUDINARY_API_SECRET")
        .map_err(|_| "CLOUDINARY_API_SECRET must be set with CLOUDINARY_CLOUD_NAME".to_string())?;

    Ok(Some(MediaConfig {
        cloud_name,
        api_key,
        api_secret,
        folder: std::env::var("MEDIA_FOLDER").unwrap_or_else(|_| DEFAULT_MEDIA_FOLDER.to_string()),
        max_upload_bytes: parse_env_or_default("MEDIA_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        request_timeout_ms: parse_env_or_default("MEDIA_REQUEST_TIMEOUT_MS", 30_000)?,
    }))
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
