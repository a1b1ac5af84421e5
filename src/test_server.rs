//! In-process fake `mod_dav_svn` endpoint for unit tests.
//!
//! Serves one request per connection (`Connection: close`) over a plain
//! `TcpListener`, answering `OPTIONS`, `PROPFIND` on `!svn/bc`, `!svn/vcc`
//! and `!svn/bln` resources, `GET` and the `log-report` `REPORT` from an
//! in-memory revision history.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine as _;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::path::{self, ROOT};

pub(crate) fn run_async<T>(f: impl Future<Output = T>) -> T {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

/// Returns a URL whose port was just released, so connecting is refused.
pub(crate) async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/repo")
}

#[derive(Clone, Debug)]
enum Entry {
    Dir {
        created_rev: u64,
        author: Option<String>,
    },
    File {
        content: Vec<u8>,
        created_rev: u64,
        author: Option<String>,
    },
}

impl Entry {
    fn created_rev(&self) -> u64 {
        match self {
            Self::Dir { created_rev, .. } | Self::File { created_rev, .. } => *created_rev,
        }
    }

    fn author(&self) -> Option<&str> {
        match self {
            Self::Dir { author, .. } | Self::File { author, .. } => author.as_deref(),
        }
    }
}

#[derive(Clone, Debug)]
struct Revision {
    tree: BTreeMap<String, Entry>,
    author: Option<String>,
    message: Option<String>,
    date: String,
}

/// Mutates the tree of the revision being committed.
pub(crate) struct TreeEdit<'a> {
    tree: &'a mut BTreeMap<String, Entry>,
    rev: u64,
    author: String,
}

impl TreeEdit<'_> {
    fn touch_dir(&mut self, dir: &str) {
        self.tree.insert(
            dir.to_string(),
            Entry::Dir {
                created_rev: self.rev,
                author: Some(self.author.clone()),
            },
        );
    }

    fn touch_ancestors(&mut self, path: &str) {
        let mut cur = path::parent_of(path).map(str::to_string);
        while let Some(dir) = cur {
            self.touch_dir(&dir);
            cur = path::parent_of(&dir).map(str::to_string);
        }
    }

    pub(crate) fn add_dir(&mut self, dir: &str) {
        self.touch_ancestors(dir);
        self.touch_dir(dir);
    }

    pub(crate) fn add_file(&mut self, file: &str, content: &[u8]) {
        self.touch_ancestors(file);
        self.tree.insert(
            file.to_string(),
            Entry::File {
                content: content.to_vec(),
                created_rev: self.rev,
                author: Some(self.author.clone()),
            },
        );
    }

    pub(crate) fn remove(&mut self, target: &str) {
        self.touch_ancestors(target);
        let prefix = format!("{target}/");
        self.tree
            .retain(|k, _| k != target && !k.starts_with(&prefix));
    }
}

/// Revision history and behavior switches of the fake server.
#[derive(Clone, Debug)]
pub(crate) struct FakeRepo {
    root: String,
    uuid: String,
    revisions: Vec<Revision>,
    announce_youngest: bool,
    authorization: Option<String>,
    failures: HashMap<String, u16>,
    delays: HashMap<String, Duration>,
    delay_all: Option<Duration>,
}

impl FakeRepo {
    /// Creates a repository served at URL path `root` holding only `r0`.
    pub(crate) fn new(root: &str) -> Self {
        let mut tree = BTreeMap::new();
        tree.insert(
            ROOT.to_string(),
            Entry::Dir {
                created_rev: 0,
                author: None,
            },
        );
        Self {
            root: root.trim_end_matches('/').to_string(),
            uuid: "5f1a4c2e-0000-4000-8000-00000000beef".to_string(),
            revisions: vec![Revision {
                tree,
                author: None,
                message: None,
                date: revision_date(0),
            }],
            announce_youngest: true,
            authorization: None,
            failures: HashMap::new(),
            delays: HashMap::new(),
            delay_all: None,
        }
    }

    pub(crate) fn youngest(&self) -> u64 {
        (self.revisions.len() - 1) as u64
    }

    /// Commits a new revision built from the previous tree.
    pub(crate) fn commit(&mut self, author: &str, message: &str, edit: impl FnOnce(&mut TreeEdit<'_>)) {
        let rev = self.youngest() + 1;
        let mut tree = self.revisions.last().unwrap().tree.clone();
        edit(&mut TreeEdit {
            tree: &mut tree,
            rev,
            author: author.to_string(),
        });
        self.revisions.push(Revision {
            tree,
            author: Some(author.to_string()),
            message: Some(message.to_string()),
            date: revision_date(rev),
        });
    }

    /// Controls whether `OPTIONS` carries `SVN-Youngest-Rev`.
    pub(crate) fn announce_youngest(&mut self, on: bool) {
        self.announce_youngest = on;
    }

    pub(crate) fn require_credentials(&mut self, user: &str, pass: &str) {
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        self.authorization = Some(format!("Basic {token}"));
    }

    /// Answers every baseline request for `logical` with `status`.
    /// A `3xx` status redirects the request back to itself.
    pub(crate) fn fail_path(&mut self, logical: &str, status: u16) {
        self.failures.insert(logical.to_string(), status);
    }

    /// Delays every baseline request for `logical`.
    pub(crate) fn delay_path(&mut self, logical: &str, delay: Duration) {
        self.delays.insert(logical.to_string(), delay);
    }

    /// Delays every request.
    pub(crate) fn delay_all(&mut self, delay: Duration) {
        self.delay_all = Some(delay);
    }

    fn respond(&self, req: &Request) -> (Option<Duration>, Reply) {
        if let Some(expected) = self.authorization.as_deref()
            && req.headers.get("authorization").map(String::as_str) != Some(expected)
        {
            let mut reply = Reply::status(401);
            reply
                .headers
                .push(("WWW-Authenticate", r#"Basic realm="fake""#.to_string()));
            return (self.delay_all, reply);
        }

        let target = req.target.split('?').next().unwrap_or_default();
        let decoded = urlencoding::decode(target)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| target.to_string());
        let Some(rest) = decoded.strip_prefix(self.root.as_str()) else {
            return (self.delay_all, Reply::status(404));
        };
        if !rest.is_empty() && !rest.starts_with('/') {
            return (self.delay_all, Reply::status(404));
        }

        if req.method == "OPTIONS" {
            return (self.delay_all, self.options());
        }
        if let Some(after) = rest.strip_prefix("/!svn/bc/") {
            let (rev, tail) = after.split_once('/').unwrap_or((after, ""));
            let tail = tail.trim_end_matches('/');
            let logical = if tail.is_empty() {
                ROOT.to_string()
            } else {
                format!("/{tail}")
            };
            let delay = self.delays.get(&logical).copied().or(self.delay_all);
            if let Some(status) = self.failures.get(&logical) {
                let mut reply = Reply::status(*status);
                if (300..400).contains(status) {
                    reply.headers.push(("Location", req.target.clone()));
                }
                return (delay, reply);
            }
            let Some(revision) = rev.parse::<usize>().ok().and_then(|r| self.revisions.get(r)) else {
                return (delay, Reply::status(404));
            };
            let rev = rev.parse::<u64>().unwrap_or_default();
            return (delay, self.baseline(req, rev, revision, &logical));
        }
        if rest == "/!svn/vcc/default" && req.method == "PROPFIND" {
            let body = multistatus(&format!(
                "<D:response><D:href>{root}/!svn/vcc/default</D:href><D:propstat><D:prop>\
                 <D:checked-in><D:href>{root}/!svn/bln/{rev}</D:href></D:checked-in>\
                 </D:prop><D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>",
                root = self.root,
                rev = self.youngest(),
            ));
            return (self.delay_all, Reply::xml(207, body));
        }
        if let Some(rev) = rest.strip_prefix("/!svn/bln/")
            && req.method == "PROPFIND"
        {
            let body = multistatus(&format!(
                "<D:response><D:href>{root}/!svn/bln/{rev}</D:href><D:propstat><D:prop>\
                 <D:version-name>{rev}</D:version-name>\
                 </D:prop><D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>",
                root = self.root,
            ));
            return (self.delay_all, Reply::xml(207, body));
        }
        (self.delay_all, Reply::status(404))
    }

    fn options(&self) -> Reply {
        let mut reply = Reply::xml(
            200,
            r#"<?xml version="1.0" encoding="utf-8"?><D:options-response xmlns:D="DAV:"/>"#
                .to_string(),
        );
        reply.headers.push(("DAV", "1,2".to_string()));
        reply
            .headers
            .push(("DAV", "version-control,checkout,working-resource".to_string()));
        reply.headers.push(("SVN-Repository-Root", self.root.clone()));
        reply.headers.push(("SVN-Repository-UUID", self.uuid.clone()));
        if self.announce_youngest {
            reply
                .headers
                .push(("SVN-Youngest-Rev", self.youngest().to_string()));
        }
        reply
    }

    fn baseline(&self, req: &Request, rev: u64, revision: &Revision, logical: &str) -> Reply {
        match req.method.as_str() {
            "PROPFIND" => {
                let Some(entry) = revision.tree.get(logical) else {
                    return Reply::status(404);
                };
                let mut body = self.prop_response(rev, logical, entry);
                if req.headers.get("depth").map(String::as_str) == Some("1")
                    && matches!(entry, Entry::Dir { .. })
                {
                    for (child, entry) in &revision.tree {
                        if child != logical && path::parent_of(child) == Some(logical) {
                            body.push_str(&self.prop_response(rev, child, entry));
                        }
                    }
                }
                Reply::xml(207, multistatus(&body))
            }
            "GET" => match revision.tree.get(logical) {
                Some(Entry::File { content, .. }) => Reply {
                    status: 200,
                    headers: vec![("Content-Type", "text/plain".to_string())],
                    body: content.clone(),
                },
                Some(Entry::Dir { .. }) => Reply::status(200),
                None => Reply::status(404),
            },
            "REPORT" => self.log_report(&req.body),
            _ => Reply::status(405),
        }
    }

    fn prop_response(&self, rev: u64, logical: &str, entry: &Entry) -> String {
        let escaped = if logical == ROOT {
            String::new()
        } else {
            path::escape_for_request(logical)
        };
        let (slash, resourcetype, file_props) = match entry {
            Entry::Dir { .. } => (
                "/",
                "<D:resourcetype><D:collection/></D:resourcetype>",
                String::new(),
            ),
            Entry::File { content, .. } => (
                "",
                "<D:resourcetype/>",
                format!(
                    "<D:getcontentlength>{}</D:getcontentlength>\
                     <D:getcontenttype>text/plain</D:getcontenttype>",
                    content.len()
                ),
            ),
        };
        let author = entry
            .author()
            .map(|a| format!("<D:creator-displayname>{}</D:creator-displayname>", xml_escape(a)))
            .unwrap_or_default();
        format!(
            "<D:response><D:href>{root}/!svn/bc/{rev}{escaped}{slash}</D:href>\
             <D:propstat><D:prop>{resourcetype}{file_props}\
             <D:version-name>{created}</D:version-name>{author}\
             </D:prop><D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>",
            root = self.root,
            created = entry.created_rev(),
        )
    }

    fn log_report(&self, body: &str) -> Reply {
        let start = element_value(body, "start-revision")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(|| self.youngest());
        let end = element_value(body, "end-revision")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let limit = element_value(body, "limit")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(usize::MAX);
        if start > self.youngest() {
            return Reply::status(404);
        }

        let mut items = String::new();
        for rev in (end..=start).rev().take(limit) {
            let revision = &self.revisions[rev as usize];
            items.push_str("<S:log-item>");
            items.push_str(&format!("<D:version-name>{rev}</D:version-name>"));
            if let Some(author) = revision.author.as_deref() {
                items.push_str(&format!(
                    "<D:creator-displayname>{}</D:creator-displayname>",
                    xml_escape(author)
                ));
            }
            items.push_str(&format!("<S:date>{}</S:date>", revision.date));
            if let Some(message) = revision.message.as_deref() {
                items.push_str(&format!("<D:comment>{}</D:comment>", xml_escape(message)));
            }
            items.push_str("</S:log-item>");
        }
        Reply::xml(
            200,
            format!(
                r#"<?xml version="1.0" encoding="utf-8"?><S:log-report xmlns:S="svn:" xmlns:D="DAV:">{items}</S:log-report>"#
            ),
        )
    }
}

fn revision_date(rev: u64) -> String {
    format!("2024-10-01T10:{:02}:00.000000Z", rev % 60)
}

fn multistatus(responses: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><D:multistatus xmlns:D="DAV:">{responses}</D:multistatus>"#
    )
}

fn element_value<'a>(body: &'a str, local: &str) -> Option<&'a str> {
    let open = format!(":{local}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find("</")? + start;
    Some(body[start..end].trim())
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Debug)]
struct Request {
    method: String,
    target: String,
    headers: HashMap<String, String>,
    body: String,
}

struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

impl Reply {
    fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    fn xml(status: u16, body: String) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", r#"text/xml; charset="utf-8""#.to_string())],
            body: body.into_bytes(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let reason = match self.status {
            200 => "OK",
            207 => "Multi-Status",
            302 => "Found",
            401 => "Authorization Required",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Error",
        };
        let mut head = format!("HTTP/1.1 {} {reason}\r\n", self.status);
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        ));
        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let len = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[header_end..].to_vec();
    while body.len() < len {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Some(Request {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// A running fake endpoint; stops accepting when dropped.
pub(crate) struct FakeDavServer {
    addr: SocketAddr,
    root: String,
    repo: Arc<Mutex<FakeRepo>>,
    requests: Arc<Mutex<Vec<String>>>,
    task: tokio::task::JoinHandle<()>,
}

impl FakeDavServer {
    pub(crate) async fn start(repo: FakeRepo) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let root = repo.root.clone();
        let repo = Arc::new(Mutex::new(repo));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let repo = repo.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let repo = repo.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let Some(req) = read_request(&mut stream).await else {
                            return;
                        };
                        requests
                            .lock()
                            .unwrap()
                            .push(format!("{} {}", req.method, req.target));
                        let (delay, reply) = repo.lock().unwrap().respond(&req);
                        if let Some(delay) = delay {
                            tokio::time::sleep(delay).await;
                        }
                        let _ = stream.write_all(&reply.encode()).await;
                        let _ = stream.shutdown().await;
                    });
                }
            })
        };

        Self {
            addr,
            root,
            repo,
            requests,
            task,
        }
    }

    pub(crate) fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL of the repository root.
    pub(crate) fn url(&self) -> String {
        format!("http://{}{}", self.addr, self.root)
    }

    /// `"METHOD /escaped/target"` for every request served so far.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    /// Runs `f` against the live repository (e.g. to commit while a session is open).
    pub(crate) fn with_repo<R>(&self, f: impl FnOnce(&mut FakeRepo) -> R) -> R {
        f(&mut self.repo.lock().unwrap())
    }
}

impl Drop for FakeDavServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
