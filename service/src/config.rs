use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Path of the route the authorization server sends the browser back to.
/// The configured redirect URI must point at this path.
pub const CALLBACK_PATH: &str = "/callback";

pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.bungie.net/en/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://www.bungie.net/platform/app/oauth/token/";
pub const DEFAULT_API_BASE_URL: &str = "https://www.bungie.net/Platform";
pub const DEFAULT_PROFILE_PATH: &str = "/User/GetMembershipsForCurrentUser/";
/// Upper bound for `OAUTH_STATE_TTL_SECS` (one day).
pub const MAX_OAUTH_STATE_TTL_SECS: u64 = 86_400;
/// Upper bound for `BACKEND_SESSION_EXPIRY_SECONDS` (one year).
pub const MAX_SESSION_EXPIRY_SECONDS: u64 = 31_536_000;

pub const DEFAULT_SCOPES: &str =
    "ReadBasicUserProfile,MoveEquipDestinyItems,ReadDestinyInventoryAndVault,ReadUserData";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Problems found while checking a parsed `Config` before the server starts.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// A value that has no usable default was not provided.
    MissingValue(&'static str),
    /// The redirect URI is not an absolute http(s) URL ending in `CALLBACK_PATH`.
    InvalidRedirectUri(String),
    /// A duration setting exceeds the largest value the server accepts.
    OutOfRange { name: &'static str, max: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::MissingValue(name) => write!(f, "missing configuration value: {name}"),
            ConfigError::InvalidRedirectUri(reason) => {
                write!(f, "invalid redirect URI: {reason}")
            }
            ConfigError::OutOfRange { name, max } => {
                write!(f, "{name} must not exceed {max}")
            }
        }
    }
}

impl StdError for ConfigError {}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The OAuth client id issued by the Bungie.net application portal.
    #[arg(long, env)]
    bungie_client_id: Option<String>,

    /// The OAuth client secret issued by the Bungie.net application portal.
    /// Only ever used server-side for the authorization code exchange.
    #[arg(long, env, hide_env_values = true)]
    bungie_client_secret: Option<String>,

    /// The Bungie.net API key sent as `X-API-Key` on platform requests.
    #[arg(long, env, hide_env_values = true)]
    bungie_api_key: Option<String>,

    /// The redirect URI registered with Bungie.net. This single value is used both
    /// when building the authorization URL and during the token exchange.
    #[arg(long, env, default_value = "http://localhost:4000/callback")]
    bungie_redirect_uri: String,

    /// The authorization endpoint the browser is sent to.
    #[arg(long, env, default_value = DEFAULT_AUTHORIZE_URL)]
    bungie_authorize_url: String,

    /// The token endpoint used to exchange an authorization code.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_TOKEN_URL)]
    bungie_token_url: String,

    /// The base URL of the Bungie.net platform API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_API_BASE_URL)]
    bungie_api_base_url: String,

    /// The protected profile path, relative to the platform API base URL.
    #[arg(long, env, default_value = DEFAULT_PROFILE_PATH)]
    bungie_profile_path: String,

    /// A comma separated list of scopes to request during authorization.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = DEFAULT_SCOPES
    )]
    pub bungie_scopes: Vec<String>,

    /// Timeout in seconds for establishing an outbound connection
    #[arg(long, env, default_value_t = 5)]
    pub http_connect_timeout_secs: u64,

    /// Timeout in seconds for a complete outbound request
    #[arg(long, env, default_value_t = 20)]
    pub http_timeout_secs: u64,

    /// Seconds a login attempt may stay pending before its state is rejected
    #[arg(long, env, default_value_t = 600)]
    pub oauth_state_ttl_secs: u64,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Session expiry duration in seconds of inactivity (default: 24 hours = 86400 seconds)
    #[arg(long, env, default_value_t = 86400)]
    pub backend_session_expiry_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Checks the values the login flow cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bungie_client_id.as_deref().unwrap_or_default().is_empty() {
            return Err(ConfigError::MissingValue("BUNGIE_CLIENT_ID"));
        }
        if self
            .bungie_client_secret
            .as_deref()
            .unwrap_or_default()
            .is_empty()
        {
            return Err(ConfigError::MissingValue("BUNGIE_CLIENT_SECRET"));
        }
        if self.oauth_state_ttl_secs > MAX_OAUTH_STATE_TTL_SECS {
            return Err(ConfigError::OutOfRange {
                name: "OAUTH_STATE_TTL_SECS",
                max: MAX_OAUTH_STATE_TTL_SECS,
            });
        }
        if self.backend_session_expiry_seconds > MAX_SESSION_EXPIRY_SECONDS {
            return Err(ConfigError::OutOfRange {
                name: "BACKEND_SESSION_EXPIRY_SECONDS",
                max: MAX_SESSION_EXPIRY_SECONDS,
            });
        }
        validate_redirect_uri(&self.bungie_redirect_uri)
    }

    pub fn bungie_client_id(&self) -> Option<String> {
        self.bungie_client_id.clone()
    }

    pub fn bungie_client_secret(&self) -> Option<String> {
        self.bungie_client_secret.clone()
    }

    pub fn bungie_api_key(&self) -> Option<String> {
        self.bungie_api_key.clone()
    }

    pub fn redirect_uri(&self) -> &str {
        &self.bungie_redirect_uri
    }

    pub fn authorize_url(&self) -> &str {
        &self.bungie_authorize_url
    }

    pub fn token_url(&self) -> &str {
        &self.bungie_token_url
    }

    pub fn api_base_url(&self) -> &str {
        &self.bungie_api_base_url
    }

    pub fn profile_path(&self) -> &str {
        &self.bungie_profile_path
    }

    pub fn scopes(&self) -> &[String] {
        &self.bungie_scopes
    }

    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http_connect_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn oauth_state_ttl(&self) -> Duration {
        Duration::from_secs(self.oauth_state_ttl_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

fn validate_redirect_uri(value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidRedirectUri(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidRedirectUri(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }
    if url.path() != CALLBACK_PATH {
        return Err(ConfigError::InvalidRedirectUri(format!(
            "path must be {CALLBACK_PATH}, got {}",
            url.path()
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidRedirectUri(
            "query and fragment are not allowed".to_string(),
        ));
    }

    Ok(())
}
