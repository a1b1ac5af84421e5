use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{ConnectParams, Session, SvnError};

/// Named connection parameters from which sessions are started.
///
/// Cloning is cheap; clones share the same entries. Sessions started from the
/// registry are fully independent of each other.
#[derive(Clone, Default)]
pub struct FileSystemRegistry {
    inner: Arc<Mutex<HashMap<String, ConnectParams>>>,
}

impl std::fmt::Debug for FileSystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemRegistry")
            .field("names", &self.names().unwrap_or_default())
            .finish()
    }
}

impl FileSystemRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, ConnectParams>>, SvnError> {
        self.inner
            .lock()
            .map_err(|_| SvnError::Protocol("registry lock poisoned".into()))
    }

    /// Registers `params` under its own [`ConnectParams::name`].
    ///
    /// Returns the parameters previously registered under that name.
    pub fn register(&self, params: ConnectParams) -> Result<Option<ConnectParams>, SvnError> {
        let name = params
            .name()
            .map(str::to_string)
            .ok_or_else(|| SvnError::InvalidConfig("name is required to register".into()))?;
        Ok(self.entries()?.insert(name, params))
    }

    /// Registers `params` under `name`, overriding any name they carry.
    pub fn register_named(
        &self,
        name: impl Into<String>,
        params: ConnectParams,
    ) -> Result<Option<ConnectParams>, SvnError> {
        self.register(params.with_name(name))
    }

    /// Returns the parameters registered under `name`.
    pub fn get(&self, name: &str) -> Result<Option<ConnectParams>, SvnError> {
        Ok(self.entries()?.get(name).cloned())
    }

    /// Removes and returns the parameters registered under `name`.
    pub fn unregister(&self, name: &str) -> Result<Option<ConnectParams>, SvnError> {
        Ok(self.entries()?.remove(name))
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Result<Vec<String>, SvnError> {
        let mut names: Vec<String> = self.entries()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Starts a new session for the endpoint registered under `name`.
    ///
    /// Unknown names fail with [`SvnError::NotFound`].
    pub async fn start_session(&self, name: &str) -> Result<Session, SvnError> {
        let params = self
            .get(name)?
            .ok_or_else(|| SvnError::NotFound(format!("no file system registered as {name}")))?;
        Session::start(params).await
    }
}
