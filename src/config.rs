/// Basic-auth credentials for the CIRCL passive DNS API.
#[derive(Debug, Clone)]
pub struct CirclAuth {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Retry attempts after the first try, for transient HTTP failures.
    pub retries: u32,
    /// Connect and read timeout per attempt, in seconds.
    pub timeout_secs: u64,
    /// Backoff factor: the sleep before retry n is `factor * 2^(n-1)` seconds.
    pub backoff_factor: f64,
    /// Upper bound on a single backoff sleep.
    pub max_backoff_secs: u64,
    /// Identifying User-Agent attached to every outbound request.
    pub user_agent: String,
    /// Credentials for the CIRCL source; `None` disables it.
    pub circl_auth: Option<CirclAuth>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            retries: 10,
            timeout_secs: 15,
            backoff_factor: 1.2,
            max_backoff_secs: 30,
            user_agent: concat!("subscout/", env!("CARGO_PKG_VERSION")).to_string(),
            circl_auth: None,
        }
    }
}
