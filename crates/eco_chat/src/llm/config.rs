//! Backend endpoints and credentials.

/// Default endpoint of the hosted chat-completion API
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default address of the local inference daemon
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Port the local daemon listens on when `OLLAMA_HOST` names none
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Where the two backends live and how to authenticate with the hosted one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// Hosted API key. `None` leaves hosted models unusable.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub ollama_host: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
        }
    }
}

impl LlmConfig {
    /// Read configuration from environment variables
    ///
    /// - `OPENAI_API_KEY`
    /// - `OPENAI_BASE_URL`
    /// - `OLLAMA_HOST`
    ///
    /// Unset or empty variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_base_url: non_empty("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            ollama_host: non_empty("OLLAMA_HOST")
                .map(|host| normalize_host(&host))
                .unwrap_or(defaults.ollama_host),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn with_openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai_base_url = url.into();
        self
    }

    pub fn with_ollama_host(mut self, host: impl Into<String>) -> Self {
        self.ollama_host = normalize_host(&host.into());
        self
    }
}

/// `OLLAMA_HOST` is commonly set as a bare `host` or `host:port`.
///
/// A bare host gets the daemon's default port. An explicit scheme keeps the
/// scheme's own default port, matching the official Ollama clients.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        return host.to_string();
    }

    let (authority, path) = match host.find('/') {
        Some(idx) => host.split_at(idx),
        None => (host, ""),
    };
    // Only look for a port after a bracketed IPv6 literal
    let port_part = match authority.rfind(']') {
        Some(idx) => &authority[idx..],
        None => authority,
    };

    if port_part.contains(':') {
        format!("http://{}", host)
    } else {
        format!("http://{}:{}{}", authority, DEFAULT_OLLAMA_PORT, path)
    }
}
