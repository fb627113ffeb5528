use reqwest::header::HeaderValue;

use crate::error::{AppError, Result};

pub const NAVER_API_URL: &str = "https://api.naver.com";
pub const GOOGLE_ADS_API_URL: &str = "https://googleads.googleapis.com/v20";
pub const GOOGLE_OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Path of the keyword tool endpoint. Also the URI that gets signed.
pub const NAVER_KEYWORD_TOOL_URI: &str = "/keywordstool";

/// The keyword tool rejects more than 5 hint keywords per call.
pub const NAVER_MAX_KEYWORDS_PER_REQUEST: usize = 5;

/// GenerateKeywordIdeas accepts at most 20 seed keywords.
pub const GOOGLE_MAX_KEYWORDS_PER_REQUEST: usize = 20;

/// Pause between consecutive batches (milliseconds).
pub const NAVER_BATCH_DELAY_MS: u64 = 300;
pub const GOOGLE_BATCH_DELAY_MS: u64 = 500;

/// Korean language / South Korea geo target.
pub const GOOGLE_LANGUAGE_KO: &str = "languageConstants/1012";
pub const GOOGLE_GEO_KR: &str = "geoTargetConstants/2410";

/// Default cap on primary keywords forwarded to the secondary provider.
pub const DEFAULT_LOOKUP_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    pub http_timeout_secs: u64,
    /// Max primary keywords cross-referenced with Google (GOOGLE_LOOKUP_LIMIT)
    pub lookup_limit: usize,
    pub naver_api_url: String,
    pub google_ads_api_url: String,
    pub google_oauth_token_url: String,

    pub naver_api_key: Option<String>,
    pub naver_customer_id: Option<String>,
    pub naver_secret_key: Option<String>,

    pub google_customer_id: Option<String>,
    pub google_developer_token: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_refresh_token: Option<String>,
    /// Manager account id, only needed when access goes through an MCC.
    pub google_login_customer_id: Option<String>,
}

/// Validated Naver Search Ad credentials.
#[derive(Debug, Clone)]
pub struct NaverCredentials {
    pub api_key: String,
    pub customer_id: String,
    pub secret_key: String,
}

/// Validated Google Ads credentials.
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    /// Digits only, dashes removed.
    pub customer_id: String,
    pub developer_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub login_customer_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u64>()
                .map_err(|_| AppError::Config("HTTP_TIMEOUT_SECS must be a whole number of seconds".to_string()))?,
            lookup_limit: std::env::var("GOOGLE_LOOKUP_LIMIT")
                .unwrap_or_else(|_| DEFAULT_LOOKUP_LIMIT.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_LOOKUP_LIMIT),
            naver_api_url: std::env::var("NAVER_API_URL").unwrap_or_else(|_| NAVER_API_URL.to_string()),
            google_ads_api_url: std::env::var("GOOGLE_ADS_API_URL")
                .unwrap_or_else(|_| GOOGLE_ADS_API_URL.to_string()),
            google_oauth_token_url: std::env::var("GOOGLE_OAUTH_TOKEN_URL")
                .unwrap_or_else(|_| GOOGLE_OAUTH_TOKEN_URL.to_string()),
            naver_api_key: env_opt("NAVER_AD_API_KEY"),
            naver_customer_id: env_opt("NAVER_AD_CUSTOMER_ID"),
            naver_secret_key: env_opt("NAVER_AD_SECRET_KEY"),
            google_customer_id: env_opt("GOOGLE_ADS_CUSTOMER_ID"),
            google_developer_token: env_opt("GOOGLE_ADS_DEVELOPER_TOKEN"),
            google_client_id: env_opt("GOOGLE_ADS_CLIENT_ID"),
            google_client_secret: env_opt("GOOGLE_ADS_CLIENT_SECRET"),
            google_refresh_token: env_opt("GOOGLE_ADS_REFRESH_TOKEN"),
            google_login_customer_id: env_opt("GOOGLE_ADS_LOGIN_CUSTOMER_ID"),
        })
    }

    pub fn naver_credentials(&self) -> Result<NaverCredentials> {
        Ok(NaverCredentials {
            api_key: header_safe(required(&self.naver_api_key, "NAVER_AD_API_KEY")?, "NAVER_AD_API_KEY")?,
            customer_id: header_safe(required(&self.naver_customer_id, "NAVER_AD_CUSTOMER_ID")?, "NAVER_AD_CUSTOMER_ID")?,
            secret_key: required(&self.naver_secret_key, "NAVER_AD_SECRET_KEY")?,
        })
    }

    pub fn google_credentials(&self) -> Result<GoogleCredentials> {
        Ok(GoogleCredentials {
            customer_id: strip_dashes(&required(&self.google_customer_id, "GOOGLE_ADS_CUSTOMER_ID")?),
            developer_token: header_safe(
                required(&self.google_developer_token, "GOOGLE_ADS_DEVELOPER_TOKEN")?,
                "GOOGLE_ADS_DEVELOPER_TOKEN",
            )?,
            client_id: required(&self.google_client_id, "GOOGLE_ADS_CLIENT_ID")?,
            client_secret: required(&self.google_client_secret, "GOOGLE_ADS_CLIENT_SECRET")?,
            refresh_token: required(&self.google_refresh_token, "GOOGLE_ADS_REFRESH_TOKEN")?,
            login_customer_id: self.google_login_customer_id.as_deref().map(strip_dashes),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            api_port: 8080,
            http_timeout_secs: 10,
            lookup_limit: DEFAULT_LOOKUP_LIMIT,
            naver_api_url: NAVER_API_URL.to_string(),
            google_ads_api_url: GOOGLE_ADS_API_URL.to_string(),
            google_oauth_token_url: GOOGLE_OAUTH_TOKEN_URL.to_string(),
            naver_api_key: None,
            naver_customer_id: None,
            naver_secret_key: None,
            google_customer_id: None,
            google_developer_token: None,
            google_client_id: None,
            google_client_secret: None,
            google_refresh_token: None,
            google_login_customer_id: None,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Config(format!("{name} is not set"))),
    }
}

/// Credentials sent verbatim as request headers must be valid header values.
fn header_safe(value: String, name: &str) -> Result<String> {
    HeaderValue::from_str(&value)
        .map_err(|_| AppError::Config(format!("{name} contains characters not allowed in a header")))?;
    Ok(value)
}

fn strip_dashes(id: &str) -> String {
    id.chars().filter(|c| *c != '-').collect()
}
