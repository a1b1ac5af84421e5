//! Connection parameters for [`crate::Session`].

use std::time::Duration;

use crate::{DavUrl, SvnError};

/// Timeout used when `timeout-ms` is not configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("svnfs/", env!("CARGO_PKG_VERSION"));

/// Immutable connection parameters for one repository endpoint.
///
/// Recognized option names (see [`ConnectParams::from_pairs`]):
///
/// - `name`: logical name used by [`crate::FileSystemRegistry`]
/// - `server-url`: `http(s)://` URL of the repository (or a directory inside it)
/// - `user-name` / `user-password`: Basic credentials sent with every request
/// - `timeout-ms`: budget for each network call; absent uses [`DEFAULT_TIMEOUT`]
#[derive(Clone)]
pub struct ConnectParams {
    name: Option<String>,
    server_url: DavUrl,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
    user_agent: String,
}

impl std::fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectParams")
            .field("name", &self.name)
            .field("server_url", &self.server_url.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConnectParams {
    /// Creates parameters for an endpoint without credentials.
    pub fn new(server_url: DavUrl) -> Self {
        Self {
            name: None,
            server_url,
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Builds parameters from `(option, value)` pairs using the option names
    /// listed on [`ConnectParams`].
    ///
    /// Unknown options are rejected so that typos do not silently fall back to
    /// defaults.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, SvnError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut name = None;
        let mut server_url = None;
        let mut username = None;
        let mut password = None;
        let mut timeout = None;

        for (key, value) in pairs {
            match key.trim() {
                "name" => name = Some(value.to_string()),
                "server-url" => server_url = Some(DavUrl::parse(value)?),
                "user-name" => username = Some(value.to_string()),
                "user-password" => password = Some(value.to_string()),
                "timeout-ms" => {
                    let ms = value.trim().parse::<u64>().map_err(|_| {
                        SvnError::InvalidConfig(format!("timeout-ms is not a number: {value}"))
                    })?;
                    timeout = Some(Duration::from_millis(ms));
                }
                other => {
                    return Err(SvnError::InvalidConfig(format!("unknown option: {other}")));
                }
            }
        }

        let server_url = server_url
            .ok_or_else(|| SvnError::InvalidConfig("server-url is required".into()))?;
        let mut params = Self::new(server_url);
        params.name = name;
        params.username = username;
        params.password = password;
        if let Some(timeout) = timeout {
            params = params.with_timeout(timeout);
        }
        Ok(params)
    }

    /// Returns the logical name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the configured endpoint.
    pub fn server_url(&self) -> &DavUrl {
        &self.server_url
    }

    /// Returns the configured username, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns the per-call timeout budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the `User-Agent` sent with each request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Sets the logical name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets Basic credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the per-call timeout budget.
    ///
    /// A zero duration is raised to one millisecond; it still fails fast.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Sets the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
