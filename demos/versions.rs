//! Version history: list recent revisions, then read one file at two of them.
//!
//! Set `SVN_DAV_URL=https://host/repo` and `SVN_FILE=trunk/README.txt`
//! (optional `SVN_USERNAME`/`SVN_PASSWORD`, `SVN_COUNT=5`).

use svnfs::{ConnectParams, DavUrl, Node, Session, SvnError};
use tracing_subscriber::{EnvFilter, fmt};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("svnfs=info"));
    fmt().with_env_filter(filter).with_target(false).init();
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
    let (Ok(url), Ok(file_path)) = (std::env::var("SVN_DAV_URL"), std::env::var("SVN_FILE"))
    else {
        eprintln!("Set SVN_DAV_URL=https://host/repo and SVN_FILE=path/to/file.");
        eprintln!("Optional: SVN_USERNAME/SVN_PASSWORD, SVN_COUNT=5");
        return Ok(());
    };
    let count = std::env::var("SVN_COUNT")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(5);

    let mut params = ConnectParams::new(DavUrl::parse(&url)?);
    if let Ok(user) = std::env::var("SVN_USERNAME") {
        params = params.with_credentials(user, std::env::var("SVN_PASSWORD").unwrap_or_default());
    }
    let mut session = Session::start(params).await?;

    let latest = session.latest_version().await?;
    println!("latest: {latest}");
    let versions = session.get_versions(&latest, count).await?;
    for v in &versions {
        println!(
            "{v} {} {} {}",
            v.date().unwrap_or("-"),
            v.author().unwrap_or("-"),
            v.message().unwrap_or_default().lines().next().unwrap_or_default()
        );
    }

    let Some(Node::File(current)) = session.index(&file_path).await? else {
        println!("{file_path} is not a file at {latest}");
        return Ok(());
    };
    let current_text = session.read_all_text(&current).await?;

    let Some(oldest) = versions.last().cloned() else {
        return Ok(());
    };
    session.set_current_version(oldest.clone())?;
    match session.index(&file_path).await? {
        Some(Node::File(old)) => {
            let old_text = session.read_all_text(&old).await?;
            println!(
                "{file_path}: {} bytes @{latest}, {} bytes @{oldest}, {}",
                current_text.len(),
                old_text.len(),
                if old_text == current_text { "unchanged" } else { "changed" }
            );
        }
        _ => println!("{file_path} did not exist at {oldest}"),
    }

    // `current` still reads the latest content after the switch.
    let pinned = session.read_all_text(&current).await?;
    println!("pinned node unchanged: {}", pinned == current_text);
    session.close();
    Ok(())
}
