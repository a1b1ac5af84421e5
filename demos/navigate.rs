//! Path navigation: index a path, list a directory, sum its size and read a file.
//!
//! Set `SVN_DAV_URL=https://host/repo` (optional `SVN_USERNAME`/`SVN_PASSWORD`,
//! `SVN_TIMEOUT_MS`, `SVN_PATH=trunk`). `RUST_LOG=svnfs=debug` shows requests.

use std::time::Duration;

use svnfs::{ConnectParams, DavUrl, Node, Session, SvnError};
use tracing_subscriber::{EnvFilter, fmt};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("svnfs=info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn parse_u64_env(name: &str) -> Result<Option<u64>, SvnError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| SvnError::InvalidConfig(format!("invalid {name} '{raw}'")))?;
    Ok(Some(value))
}

fn main() -> svnfs::Result<()> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| SvnError::InvalidConfig(format!("runtime: {err}")))?;
    runtime.block_on(run())
}

async fn run() -> svnfs::Result<()> {
    let url = match std::env::var("SVN_DAV_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Set SVN_DAV_URL=https://host/repo (optional SVN_USERNAME/SVN_PASSWORD).");
            eprintln!("Optional: SVN_PATH=trunk, SVN_TIMEOUT_MS=5000");
            return Ok(());
        }
    };

    let mut params = ConnectParams::new(DavUrl::parse(&url)?);
    if let Ok(user) = std::env::var("SVN_USERNAME") {
        params = params.with_credentials(user, std::env::var("SVN_PASSWORD").unwrap_or_default());
    }
    if let Some(ms) = parse_u64_env("SVN_TIMEOUT_MS")? {
        params = params.with_timeout(Duration::from_millis(ms));
    }
    let path = std::env::var("SVN_PATH").unwrap_or_default();

    let mut session = Session::start(params).await?;
    println!("connected @{}", session.current_version());

    match session.index(&path).await? {
        None => println!("'{path}' does not exist"),
        Some(Node::File(file)) => {
            println!("file {} ({} bytes, r{:?})", file.path(), file.size(), file.created_rev());
            let text = session.read_all_text(&file).await?;
            for line in text.lines().take(20) {
                println!("  {line}");
            }
        }
        Some(Node::Directory(dir)) => {
            println!("dir {} (parent {:?})", dir.path(), dir.parent_path());
            for child in session.children(&dir).await?.iter().take(50) {
                println!("  {:4} {}", child.kind(), child.name());
            }
            println!("total size: {} bytes", session.directory_size(&dir).await?);
        }
    }

    session.close();
    Ok(())
}
