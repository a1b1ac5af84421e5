use crate::SvnError;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// A normalized WebDAV endpoint URL for a Subversion repository.
///
/// Supported schemes:
///
/// - `http://` (default port `80`)
/// - `https://` (default port `443`)
///
/// The parsed URL is normalized to include an explicit port and a path without
/// a trailing slash (the root is kept as `/`). Query strings and fragments are
/// rejected.
pub struct DavUrl {
    /// `http` or `https`.
    pub scheme: String,
    /// Hostname (or IP) portion of the URL.
    pub host: String,
    /// TCP port portion of the URL.
    pub port: u16,
    /// URL path of the endpoint, percent-escaped as given (`/svn/repo`).
    pub path: String,
    /// Full normalized URL string (`scheme://host:port/path`, IPv6 uses brackets).
    pub url: String,
}

impl DavUrl {
    /// Parses and normalizes an `http://` or `https://` URL.
    ///
    /// # Examples
    ///
    /// ```
    /// # use svnfs::DavUrl;
    /// let url = DavUrl::parse("https://svn.example.com/repos/project/").unwrap();
    /// assert_eq!(url.url, "https://svn.example.com:443/repos/project");
    /// ```
    pub fn parse(input: &str) -> Result<Self, SvnError> {
        let input = input.trim();
        let (scheme, rest, default_port) = if has_prefix_ignore_case(input, "https://") {
            ("https", &input["https://".len()..], 443u16)
        } else if has_prefix_ignore_case(input, "http://") {
            ("http", &input["http://".len()..], 80u16)
        } else {
            return Err(SvnError::InvalidUrl(
                "only http:// and https:// URLs are supported".to_string(),
            ));
        };
        if rest.contains(['?', '#']) {
            return Err(SvnError::InvalidUrl(format!(
                "query strings and fragments are not supported: {input}"
            )));
        }

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        if authority.contains('@') {
            return Err(SvnError::InvalidUrl(
                "credentials in URLs are not supported (use user-name/user-password)".to_string(),
            ));
        }

        let (host, port) = if let Some(hostport) = authority.strip_prefix('[') {
            let Some(end) = hostport.find(']') else {
                return Err(SvnError::InvalidUrl(format!("invalid url: {input}")));
            };
            let host = &hostport[..end];
            let after = &hostport[end + 1..];
            if after.is_empty() {
                (host.to_string(), default_port)
            } else if let Some(port_str) = after.strip_prefix(':') {
                (host.to_string(), parse_port(port_str, input)?)
            } else {
                return Err(SvnError::InvalidUrl(format!("invalid url: {input}")));
            }
        } else {
            match authority.matches(':').count() {
                0 => (authority.to_string(), default_port),
                1 => {
                    let (h, port_str) = authority
                        .rsplit_once(':')
                        .ok_or_else(|| SvnError::InvalidUrl(format!("invalid url: {input}")))?;
                    (h.to_string(), parse_port(port_str, input)?)
                }
                _ => {
                    return Err(SvnError::InvalidUrl(
                        "IPv6 addresses must be enclosed in brackets (e.g. http://[::1]/repo)"
                            .to_string(),
                    ));
                }
            }
        };

        if host.trim().is_empty() {
            return Err(SvnError::InvalidUrl(format!(
                "missing host in url: {input}"
            )));
        }

        let path = {
            let trimmed = path.trim_end_matches('/');
            if trimmed.is_empty() {
                "/".to_string()
            } else {
                trimmed.to_string()
            }
        };

        let host_url = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.clone()
        };
        let url = format!("{scheme}://{host_url}:{port}{path}");
        Ok(Self {
            scheme: scheme.to_string(),
            host,
            port,
            path,
            url,
        })
    }

    /// Returns `scheme://host:port` without any path.
    pub fn origin(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{}://{}:{}", self.scheme, host, self.port)
    }

    /// Builds an absolute URL for an already escaped, `/`-prefixed URL path.
    pub(crate) fn with_path(&self, escaped_path: &str) -> String {
        format!("{}{}", self.origin(), escaped_path)
    }
}

fn has_prefix_ignore_case(input: &str, prefix: &str) -> bool {
    input.len() >= prefix.len()
        && input.is_char_boundary(prefix.len())
        && input[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn parse_port(port: &str, input: &str) -> Result<u16, SvnError> {
    port.parse::<u16>()
        .map_err(|_| SvnError::InvalidUrl(format!("invalid port in url: {input}")))
}

impl std::fmt::Display for DavUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

impl std::str::FromStr for DavUrl {
    type Err = SvnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
