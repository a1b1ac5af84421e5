use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::dav::xml::{
    OPTIONS_BODY, PROPFIND_CHECKED_IN_BODY, PROPFIND_NODE_BODY, PROPFIND_VERSION_NAME_BODY,
    PropSet, log_report_body, parse_log_report, parse_multistatus,
};
use crate::path::{self, ROOT};
use crate::{ConnectParams, DavUrl, NodeKind, ServerInfo, SvnError, Version};

/// Metadata of one node as reported by `PROPFIND`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeMetadata {
    /// Logical (unescaped, session-relative) path.
    pub(crate) path: String,
    pub(crate) kind: NodeKind,
    pub(crate) size: u64,
    pub(crate) created_rev: Option<u64>,
    pub(crate) last_author: Option<String>,
    pub(crate) last_modified: Option<String>,
    pub(crate) content_type: Option<String>,
}

impl NodeMetadata {
    fn from_props(path: String, props: PropSet) -> Self {
        let kind = if props.collection {
            NodeKind::Dir
        } else {
            NodeKind::File
        };
        Self {
            path,
            kind,
            size: match kind {
                NodeKind::File => props.content_length.unwrap_or(0),
                NodeKind::Dir => 0,
            },
            created_rev: props.version_name,
            last_author: props.creator,
            last_modified: props.last_modified,
            content_type: props.content_type,
        }
    }
}

struct Reply {
    context: String,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    fn into_success(self) -> Result<Self, SvnError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(SvnError::Http {
                status: self.status.as_u16(),
                context: self.context,
            })
        }
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

fn dav_method(name: &'static str) -> Result<Method, SvnError> {
    Method::from_bytes(name.as_bytes())
        .map_err(|_| SvnError::Protocol(format!("invalid http method: {name}")))
}

/// Issues revision-scoped WebDAV requests against one `mod_dav_svn` endpoint.
///
/// Every request carries the configured credentials and is bounded by the
/// configured timeout. Nothing is cached and nothing is retried.
pub(crate) struct DavClient {
    http: reqwest::Client,
    base_url: DavUrl,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
    /// Escaped URL path of the repository root, `""` when served at `/`.
    repo_root: String,
    /// Logical path of the configured endpoint inside the repository.
    base_relative: String,
}

impl std::fmt::Debug for DavClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DavClient")
            .field("base_url", &self.base_url.url)
            .field("repo_root", &self.repo_root)
            .field("base_relative", &self.base_relative)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DavClient {
    pub(crate) fn new(params: &ConnectParams) -> Result<Self, SvnError> {
        let http = reqwest::Client::builder()
            .timeout(params.timeout())
            .connect_timeout(params.timeout())
            .user_agent(params.user_agent())
            .build()
            .map_err(|err| SvnError::InvalidConfig(format!("http client: {err}")))?;

        let base_url = params.server_url().clone();
        let base_path = path::decode_href(&base_url.path);
        Ok(Self {
            http,
            repo_root: escaped_root(&base_path),
            base_url,
            username: params.username().map(str::to_string),
            password: params.password().map(str::to_string),
            timeout: params.timeout(),
            base_relative: ROOT.to_string(),
        })
    }

    /// Runs `OPTIONS` against the endpoint and records where the repository
    /// root is, so that baseline URLs can be built for sub-path endpoints.
    pub(crate) async fn handshake(&mut self) -> Result<ServerInfo, SvnError> {
        let url = self.base_url.url.clone();
        let reply = self
            .call(Method::OPTIONS, &url, None, Some(OPTIONS_BODY.to_string()))
            .await?;
        if reply.is_not_found() {
            return Err(SvnError::NotFound(format!("repository at {url}")));
        }
        let reply = reply.into_success()?;

        let dav_compliance: Vec<String> = reply
            .headers
            .get_all("DAV")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        let info = ServerInfo {
            youngest_rev: reply.header("SVN-Youngest-Rev").and_then(|v| v.parse().ok()),
            repository_root: reply.header("SVN-Repository-Root").map(str::to_string),
            repository_uuid: reply.header("SVN-Repository-UUID").map(str::to_string),
            dav_compliance,
        };

        if info.youngest_rev.is_none() && !info.has_compliance("version-control") {
            return Err(SvnError::Protocol(format!(
                "{url} does not look like a Subversion repository"
            )));
        }
        if let Some(root) = info.repository_root.as_deref() {
            self.set_repository_root(root);
        }
        debug!(
            url = %url,
            youngest_rev = info.youngest_rev.unwrap_or_default(),
            repo_root = %self.repo_root,
            base_relative = %self.base_relative,
            "handshake complete"
        );
        Ok(info)
    }

    fn set_repository_root(&mut self, root: &str) {
        let root = path::decode_href(root);
        let base = path::decode_href(&self.base_url.path);
        let relative = if root == ROOT {
            base
        } else if base == root {
            ROOT.to_string()
        } else if let Some(rest) = base.strip_prefix(root.as_str())
            && rest.starts_with('/')
        {
            rest.to_string()
        } else {
            debug!(root = %root, base = %base, "repository root does not contain endpoint; ignoring");
            return;
        };
        self.repo_root = escaped_root(&root);
        self.base_relative = relative;
    }

    /// Returns the baseline-collection URL of `path` (logical, session-relative)
    /// at `rev`.
    pub(crate) fn bc_url(&self, path: &str, rev: u64) -> String {
        let full = if self.base_relative == ROOT {
            path.to_string()
        } else if path == ROOT {
            self.base_relative.clone()
        } else {
            format!("{}{}", self.base_relative, path)
        };
        let mut url_path = format!("{}/!svn/bc/{rev}", self.repo_root);
        if full != ROOT {
            url_path.push_str(&path::escape_for_request(&full));
        }
        self.base_url.with_path(&url_path)
    }

    /// Returns the head revision.
    pub(crate) async fn latest_rev(&self) -> Result<u64, SvnError> {
        let reply = self
            .call(
                Method::OPTIONS,
                &self.base_url.url,
                None,
                Some(OPTIONS_BODY.to_string()),
            )
            .await?
            .into_success()?;
        if let Some(rev) = reply.header("SVN-Youngest-Rev").and_then(|v| v.parse().ok()) {
            return Ok(rev);
        }
        self.latest_rev_from_baseline().await
    }

    // Pre-HTTPv2 servers: VCC -> checked-in baseline -> version-name.
    async fn latest_rev_from_baseline(&self) -> Result<u64, SvnError> {
        let vcc = self
            .base_url
            .with_path(&format!("{}/!svn/vcc/default", self.repo_root));
        let reply = self
            .call(
                dav_method("PROPFIND")?,
                &vcc,
                Some("0"),
                Some(PROPFIND_CHECKED_IN_BODY.to_string()),
            )
            .await?
            .into_success()?;
        let baseline = parse_multistatus(&reply.text())?
            .into_iter()
            .find_map(|r| r.props.checked_in)
            .ok_or_else(|| SvnError::Protocol("vcc response missing checked-in".into()))?;
        let baseline_url = if baseline.contains("://") {
            baseline
        } else {
            self.base_url.with_path(&baseline)
        };

        let reply = self
            .call(
                dav_method("PROPFIND")?,
                &baseline_url,
                Some("0"),
                Some(PROPFIND_VERSION_NAME_BODY.to_string()),
            )
            .await?
            .into_success()?;
        parse_multistatus(&reply.text())?
            .into_iter()
            .find_map(|r| r.props.version_name)
            .ok_or_else(|| SvnError::Protocol("baseline response missing version-name".into()))
    }

    /// Resolves `path` at `rev`; `Ok(None)` if nothing exists there.
    pub(crate) async fn stat(&self, path: &str, rev: u64) -> Result<Option<NodeMetadata>, SvnError> {
        let url = self.bc_url(path, rev);
        let reply = self
            .call(
                dav_method("PROPFIND")?,
                &url,
                Some("0"),
                Some(PROPFIND_NODE_BODY.to_string()),
            )
            .await?;
        if reply.is_not_found() {
            return Ok(None);
        }
        let reply = reply.into_success()?;
        let Some(response) = parse_multistatus(&reply.text())?.into_iter().next() else {
            return Err(SvnError::Protocol(format!("empty multistatus for {url}")));
        };
        if response.status == Some(StatusCode::NOT_FOUND.as_u16()) {
            return Ok(None);
        }
        Ok(Some(NodeMetadata::from_props(path.to_string(), response.props)))
    }

    /// Lists the immediate children of the directory `path` at `rev`, sorted by path.
    pub(crate) async fn list(&self, path: &str, rev: u64) -> Result<Vec<NodeMetadata>, SvnError> {
        let url = format!("{}/", self.bc_url(path, rev));
        let reply = self
            .call(
                dav_method("PROPFIND")?,
                &url,
                Some("1"),
                Some(PROPFIND_NODE_BODY.to_string()),
            )
            .await?;
        if reply.is_not_found() {
            return Err(SvnError::NotFound(format!("{path}@{rev}")));
        }
        let reply = reply.into_success()?;

        let self_href = path::decode_href(&url);
        let mut entries = Vec::new();
        for response in parse_multistatus(&reply.text())? {
            if response
                .status
                .is_some_and(|code| !(200..300).contains(&code))
            {
                continue;
            }
            let href = path::decode_href(&response.href);
            if href == self_href {
                continue;
            }
            let name = path::file_name(&href);
            if name.is_empty() {
                continue;
            }
            entries.push(NodeMetadata::from_props(
                path::join(path, name),
                response.props,
            ));
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Fetches the content of the file `path` at `rev`.
    pub(crate) async fn get(&self, path: &str, rev: u64) -> Result<Vec<u8>, SvnError> {
        let url = self.bc_url(path, rev);
        let reply = self.call(Method::GET, &url, None, None).await?;
        if reply.is_not_found() {
            return Err(SvnError::NotFound(format!("{path}@{rev}")));
        }
        Ok(reply.into_success()?.body)
    }

    /// Runs a repository-wide log report from `start_rev` backwards, returning
    /// at most `limit` versions, most recent first.
    pub(crate) async fn log(&self, start_rev: u64, limit: usize) -> Result<Vec<Version>, SvnError> {
        let url = self
            .base_url
            .with_path(&format!("{}/!svn/bc/{start_rev}/", self.repo_root));
        let reply = self
            .call(
                dav_method("REPORT")?,
                &url,
                None,
                Some(log_report_body(start_rev, limit)),
            )
            .await?;
        if reply.is_not_found() {
            return Err(SvnError::NotFound(format!("revision {start_rev}")));
        }
        let reply = reply.into_success()?;
        let mut versions = parse_log_report(&reply.text())?;
        versions.truncate(limit);
        Ok(versions)
    }

    async fn call(
        &self,
        method: Method,
        url: &str,
        depth: Option<&'static str>,
        body: Option<String>,
    ) -> Result<Reply, SvnError> {
        let context = format!("{method} {url}");
        debug!(method = %method, url, depth = depth.unwrap_or("-"), "sending request");

        let mut request = self.http.request(method, url);
        if let Some(username) = self.username.as_deref() {
            request = request.basic_auth(username, self.password.as_deref());
        }
        if let Some(depth) = depth {
            request = request.header("Depth", depth);
        }
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "text/xml; charset=utf-8")
                .body(body);
        }

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|err| SvnError::from_transport(err, &context))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|err| SvnError::from_transport(err, &context))?;
            Ok::<_, SvnError>((status, headers, body.to_vec()))
        };
        let (status, headers, body) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SvnError::Timeout(format!(
                    "{context} timed out after {} ms",
                    self.timeout.as_millis()
                )));
            }
        };
        debug!(context = %context, status = status.as_u16(), bytes = body.len(), "received response");

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SvnError::AuthFailed(format!("{context}: {status}")));
        }
        Ok(Reply {
            context,
            status,
            headers,
            body,
        })
    }
}

fn escaped_root(decoded: &str) -> String {
    if decoded == ROOT {
        String::new()
    } else {
        path::escape_for_request(decoded)
    }
}
