//! Read-only, versioned virtual file system over Subversion's WebDAV
//! (`mod_dav_svn`) protocol.
//!
//! A [`Session`] connects to an `http(s)://` repository URL and exposes the
//! repository as a tree of [`Node`]s resolved at a *current version*. Every
//! node remembers the version it was resolved under, so pinning a session to
//! an older revision never changes what previously resolved nodes read.
//!
//! This crate is a network client only: there is no working copy, no local
//! cache and no write support.
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use svnfs::{ConnectParams, DavUrl, Session};
//!
//! fn main() -> svnfs::Result<()> {
//!     let rt = tokio::runtime::Builder::new_current_thread()
//!         .enable_all()
//!         .build()
//!         .map_err(|err| svnfs::SvnError::InvalidConfig(err.to_string()))?;
//!
//!     rt.block_on(async {
//!         let url = DavUrl::parse("https://svn.example.com/repo")?;
//!         let params = ConnectParams::new(url)
//!             .with_credentials("alice", "secret")
//!             .with_timeout(Duration::from_secs(10));
//!
//!         let mut session = Session::start(params).await?;
//!         if let Some(node) = session.index("trunk/README.txt").await? {
//!             if let Some(file) = node.as_file() {
//!                 println!("{}", session.read_all_text(file).await?);
//!             }
//!         }
//!
//!         // Older revisions are one call away.
//!         let previous = session.get_versions(session.current_version(), 1).await?;
//!         if let Some(version) = previous.into_iter().next() {
//!             session.set_current_version(version)?;
//!         }
//!         session.close();
//!         Ok(())
//!     })
//! }
//! ```
//!
//! ## Features
//!
//! - `serde`: enables `Serialize`/`Deserialize` for public data types.
//!
//! ## Protocol notes
//!
//! - Metadata comes from `PROPFIND` on baseline collections
//!   (`!svn/bc/<rev>/...`), content from `GET`, history from the `log-report`
//!   `REPORT`.
//! - Only HTTP Basic authentication is supported.
//! - Every request is bounded by [`ConnectParams::timeout`]; nothing is retried.

#![deny(unsafe_code)]

mod dav;
mod error;
mod node;
mod options;
pub mod path;
mod registry;
mod session;
#[cfg(test)]
mod test_server;
mod types;
mod url;

pub use error::SvnError;
/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, SvnError>;
pub use node::{Directory, File, Node};
pub use options::{ConnectParams, DEFAULT_TIMEOUT};
pub use registry::FileSystemRegistry;
pub use session::Session;
pub use types::{NodeKind, ServerInfo, Version};
pub use url::DavUrl;
