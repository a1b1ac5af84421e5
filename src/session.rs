use tracing::debug;

use crate::dav::DavClient;
use crate::node::{self, Directory, File, Node};
use crate::path;
use crate::{ConnectParams, ServerInfo, SvnError, Version};

/// A read-only, versioned view of one repository endpoint.
///
/// A session owns its connection context and one mutable *current version*.
/// [`Session::index`] resolves paths under the current version; every
/// returned [`Node`] keeps the version it was resolved under, so switching
/// versions later never changes what an existing node reads.
///
/// Navigation takes `&self`; switching versions and closing take `&mut self`.
/// Use independent sessions for concurrent navigation.
///
/// Node operations ([`Session::children`], [`Session::directory_size`],
/// [`Session::read_all_bytes`], [`Session::read_all_text`]) expect a node
/// resolved by this session. Nodes carry only a path and a version, so a node
/// from a session on another endpoint is looked up on this one.
pub struct Session {
    params: ConnectParams,
    client: Option<DavClient>,
    server_info: ServerInfo,
    current_version: Version,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server_url", &self.params.server_url().url)
            .field("current_version", &self.current_version.ordinal())
            .field("closed", &self.client.is_none())
            .finish()
    }
}

impl Session {
    /// Connects to the endpoint in `params` and pins the session to the
    /// latest revision.
    ///
    /// Fails with [`SvnError::AuthFailed`] if the credentials are rejected,
    /// [`SvnError::Timeout`] if the handshake exceeds the timeout budget and
    /// [`SvnError::Unreachable`] if the server cannot be reached.
    pub async fn start(params: ConnectParams) -> Result<Self, SvnError> {
        let mut client = DavClient::new(&params)?;
        let server_info = client.handshake().await?;
        let latest = match server_info.youngest_rev {
            Some(rev) => rev,
            None => client.latest_rev().await?,
        };
        debug!(
            url = %params.server_url(),
            name = params.name().unwrap_or("-"),
            rev = latest,
            "session started"
        );
        Ok(Self {
            params,
            client: Some(client),
            server_info,
            current_version: Version::new(latest),
        })
    }

    fn client(&self) -> Result<&DavClient, SvnError> {
        self.client.as_ref().ok_or(SvnError::SessionClosed)
    }

    /// Returns the parameters this session was started with.
    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    /// Returns what the server announced during [`Session::start`].
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns `true` once [`Session::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }

    /// Returns the version used by [`Session::index`].
    pub fn current_version(&self) -> &Version {
        &self.current_version
    }

    /// Re-anchors future lookups at `version`. Already resolved nodes keep
    /// their own version.
    pub fn set_current_version(&mut self, version: Version) -> Result<(), SvnError> {
        self.client()?;
        debug!(
            from = self.current_version.ordinal(),
            to = version.ordinal(),
            "switching version"
        );
        self.current_version = version;
        Ok(())
    }

    /// Queries the server for its head revision. Not cached.
    pub async fn latest_version(&self) -> Result<Version, SvnError> {
        let rev = self.client()?.latest_rev().await?;
        Ok(Version::new(rev))
    }

    /// Resolves revision `rev` with its log metadata (author, date, message).
    ///
    /// Revisions newer than head fail with [`SvnError::NotFound`].
    pub async fn version(&self, rev: u64) -> Result<Version, SvnError> {
        let client = self.client()?;
        let head = client.latest_rev().await?;
        if rev > head {
            return Err(SvnError::NotFound(format!(
                "revision {rev} (head is {head})"
            )));
        }
        let logged = client
            .log(rev, 1)
            .await?
            .into_iter()
            .find(|v| v.ordinal() == rev);
        Ok(logged.unwrap_or_else(|| Version::new(rev)))
    }

    /// Lists up to `count` versions preceding `from`, most recent first.
    ///
    /// The first entry is `from - 1`; fewer than `count` entries are returned
    /// when history runs out (`min(count, from)`). Each call queries the server.
    pub async fn get_versions(&self, from: &Version, count: usize) -> Result<Vec<Version>, SvnError> {
        let client = self.client()?;
        if count == 0 || from.ordinal() == 0 {
            return Ok(Vec::new());
        }
        let mut versions = client.log(from.ordinal() - 1, count).await?;
        versions.retain(|v| v.ordinal() < from.ordinal());
        versions.truncate(count);
        debug!(op = "get_versions", from = from.ordinal(), count, found = versions.len());
        Ok(versions)
    }

    /// Resolves `path` under the current version.
    ///
    /// `""` and `"/"` denote the root; the leading slash is optional and
    /// percent-escaped segments resolve to the same node as their plain form.
    /// Returns `Ok(None)` when nothing exists at `path`. Malformed paths fail
    /// with [`SvnError::InvalidPath`] before any request is made.
    pub async fn index(&self, path: &str) -> Result<Option<Node>, SvnError> {
        let client = self.client()?;
        let path = path::normalize_ref(path)?;
        let version = self.current_version.clone();
        debug!(op = "index", path = %path, rev = version.ordinal());
        let meta = client.stat(&path, version.ordinal()).await?;
        Ok(meta.map(|meta| Node::from_metadata(meta, version)))
    }

    /// Lists the immediate children of `dir` at the directory's own version,
    /// sorted by path. `dir` must come from this session.
    pub async fn children(&self, dir: &Directory) -> Result<Vec<Node>, SvnError> {
        let client = self.client()?;
        let entries = client.list(dir.path(), dir.version().ordinal()).await?;
        Ok(entries
            .into_iter()
            .map(|meta| Node::from_metadata(meta, dir.version().clone()))
            .collect())
    }

    /// Sums the sizes of all files below `dir` at the directory's own version.
    /// Recomputed on every call.
    pub async fn directory_size(&self, dir: &Directory) -> Result<u64, SvnError> {
        let client = self.client()?;
        debug!(op = "directory_size", path = dir.path(), rev = dir.version().ordinal());
        node::tree_size(client, dir.path(), dir.version().ordinal()).await
    }

    /// Fetches the content of `file` at the file's own version.
    pub async fn read_all_bytes(&self, file: &File) -> Result<Vec<u8>, SvnError> {
        self.client()?
            .get(file.path(), file.version().ordinal())
            .await
    }

    /// Like [`Session::read_all_bytes`], decoding invalid UTF-8 lossily.
    pub async fn read_all_text(&self, file: &File) -> Result<String, SvnError> {
        let bytes = self.read_all_bytes(file).await?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })
    }

    /// Releases the connection context. Later calls fail with
    /// [`SvnError::SessionClosed`]; closing twice is a no-op.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            debug!(url = %self.params.server_url(), "session closed");
        }
    }
}
