use crate::core::CacheError;
use std::time::Duration;

/// Backend client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is appended to
    pub base_url: String,

    /// Bearer token sent with every request
    pub auth_token: Option<String>,

    /// Request timeout, enforced by the HTTP client
    pub timeout: Duration,

    /// Age after which a cached query counts as stale
    pub stale_time: Option<Duration>,

    /// User-Agent header
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            auth_token: None,
            timeout: Duration::from_secs(30),
            stale_time: None,
            user_agent: format!("querysync/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the bearer token
    pub fn auth_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the staleness window of cached queries
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Parse from a URL carrying the token as userinfo
    ///
    /// Format: "https://token@host:port/base/path"
    ///
    /// # Examples
    ///
    /// ```
    /// # use querysync::ClientConfig;
    /// let config = ClientConfig::from_url("https://s3cret@api.example.com/v1").unwrap();
    /// assert_eq!(config.base_url, "https://api.example.com/v1");
    /// assert_eq!(config.auth_token.as_deref(), Some("s3cret"));
    /// ```
    pub fn from_url(url: &str) -> Result<Self, CacheError> {
        let mut parsed = reqwest::Url::parse(url)
            .map_err(|err| CacheError::Config(format!("invalid URL '{}': {}", url, err)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CacheError::Config(
                "URL must start with 'http://' or 'https://'".to_string(),
            ));
        }

        let token = match (parsed.username(), parsed.password()) {
            ("", None) => None,
            (_, Some(password)) => Some(password.to_string()),
            (username, None) => Some(username.to_string()),
        };
        parsed
            .set_username("")
            .map_err(|_| CacheError::Config("cannot strip credentials from URL".to_string()))?;
        parsed
            .set_password(None)
            .map_err(|_| CacheError::Config("cannot strip credentials from URL".to_string()))?;

        let base_url = parsed.as_str().trim_end_matches('/').to_string();
        let mut config = Self::new(&base_url);
        config.auth_token = token;
        Ok(config)
    }

    /// Convert to URL, token masked
    pub fn to_url(&self) -> String {
        match (&self.auth_token, self.base_url.split_once("://")) {
            (Some(_), Some((scheme, rest))) => format!("{}://***@{}", scheme, rest),
            _ => self.base_url.clone(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), CacheError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CacheError::Config(format!(
                "base_url '{}' must start with 'http://' or 'https://'",
                self.base_url
            )));
        }

        if self.timeout.is_zero() {
            return Err(CacheError::Config("timeout must be > 0".to_string()));
        }

        if matches!(&self.auth_token, Some(token) if token.is_empty()) {
            return Err(CacheError::Config("auth_token cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080/api")
    }
}
