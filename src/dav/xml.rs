//! Request bodies and response parsers for the WebDAV/DeltaV subset spoken by
//! `mod_dav_svn`.
//!
//! Elements are matched by local name; servers are free to pick namespace
//! prefixes (`D:`, `lp1:`, `S:`).

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::{SvnError, Version};

pub(crate) const OPTIONS_BODY: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<D:options xmlns:D="DAV:"><D:activity-collection-set/></D:options>"#,
);

pub(crate) const PROPFIND_NODE_BODY: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<D:propfind xmlns:D="DAV:"><D:prop>"#,
    r#"<D:resourcetype/><D:getcontentlength/><D:getcontenttype/><D:getlastmodified/>"#,
    r#"<D:version-name/><D:creator-displayname/>"#,
    r#"</D:prop></D:propfind>"#,
);

pub(crate) const PROPFIND_CHECKED_IN_BODY: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<D:propfind xmlns:D="DAV:"><D:prop><D:checked-in/></D:prop></D:propfind>"#,
);

pub(crate) const PROPFIND_VERSION_NAME_BODY: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<D:propfind xmlns:D="DAV:"><D:prop><D:version-name/></D:prop></D:propfind>"#,
);

/// Builds an `S:log-report` walking backwards from `start_rev` to `0`.
pub(crate) fn log_report_body(start_rev: u64, limit: usize) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<S:log-report xmlns:S="svn:">"#,
            "<S:start-revision>{start}</S:start-revision>",
            "<S:end-revision>0</S:end-revision>",
            "<S:limit>{limit}</S:limit>",
            "<S:path></S:path>",
            "</S:log-report>",
        ),
        start = start_rev,
        limit = limit,
    )
}

/// Properties of one `D:propstat` block (only successful blocks are kept).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PropSet {
    pub(crate) collection: bool,
    pub(crate) content_length: Option<u64>,
    pub(crate) content_type: Option<String>,
    pub(crate) last_modified: Option<String>,
    pub(crate) version_name: Option<u64>,
    pub(crate) creator: Option<String>,
    pub(crate) checked_in: Option<String>,
    status: Option<u16>,
}

impl PropSet {
    fn is_success(&self) -> bool {
        self.status.is_none_or(|code| (200..300).contains(&code))
    }

    fn merge(&mut self, other: PropSet) {
        self.collection |= other.collection;
        self.content_length = self.content_length.or(other.content_length);
        self.content_type = self.content_type.take().or(other.content_type);
        self.last_modified = self.last_modified.take().or(other.last_modified);
        self.version_name = self.version_name.or(other.version_name);
        self.creator = self.creator.take().or(other.creator);
        self.checked_in = self.checked_in.take().or(other.checked_in);
    }
}

/// One `D:response` of a `D:multistatus` document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DavResponse {
    pub(crate) href: String,
    pub(crate) status: Option<u16>,
    pub(crate) props: PropSet,
}

fn xml_error(err: impl std::fmt::Display) -> SvnError {
    SvnError::Protocol(format!("malformed xml: {err}"))
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Extracts the code from a status line such as `HTTP/1.1 404 Not Found`.
fn status_code(line: &str) -> Option<u16> {
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Parses a `207 Multi-Status` body.
pub(crate) fn parse_multistatus(xml: &str) -> Result<Vec<DavResponse>, SvnError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut responses = Vec::new();
    let mut current: Option<DavResponse> = None;
    let mut props = PropSet::default();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref());
                match name.as_str() {
                    "response" => current = Some(DavResponse::default()),
                    "propstat" => props = PropSet::default(),
                    _ => {}
                }
                stack.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                let name = local_name(e.local_name().as_ref());
                if name == "collection" && stack.last().map(String::as_str) == Some("resourcetype")
                {
                    props.collection = true;
                }
            }
            Event::Text(t) => text.push_str(&t.unescape().map_err(xml_error)?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => {
                let Some(name) = stack.pop() else {
                    continue;
                };
                let parent = stack.last().map(String::as_str);
                let value = std::mem::take(&mut text);
                match (name.as_str(), parent) {
                    ("href", Some("response")) => {
                        if let Some(response) = current.as_mut() {
                            response.href = value.trim().to_string();
                        }
                    }
                    ("href", Some("checked-in")) => props.checked_in = non_empty(value),
                    ("collection", Some("resourcetype")) => props.collection = true,
                    ("getcontentlength", _) => props.content_length = value.trim().parse().ok(),
                    ("getcontenttype", _) => props.content_type = non_empty(value),
                    ("getlastmodified", _) => props.last_modified = non_empty(value),
                    ("version-name", _) => props.version_name = value.trim().parse().ok(),
                    ("creator-displayname", _) => props.creator = non_empty(value),
                    ("status", Some("propstat")) => props.status = status_code(&value),
                    ("status", Some("response")) => {
                        if let Some(response) = current.as_mut() {
                            response.status = status_code(&value);
                        }
                    }
                    ("propstat", _) => {
                        let block = std::mem::take(&mut props);
                        if let Some(response) = current.as_mut()
                            && block.is_success()
                        {
                            response.props.merge(block);
                        }
                    }
                    ("response", _) => {
                        if let Some(response) = current.take() {
                            responses.push(response);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SvnError::Protocol("truncated multistatus response".into()));
    }
    Ok(responses)
}

/// Parses an `S:log-report` response into versions, in server order.
pub(crate) fn parse_log_report(xml: &str) -> Result<Vec<Version>, SvnError> {
    #[derive(Default)]
    struct Item {
        rev: Option<u64>,
        date: Option<String>,
        author: Option<String>,
        message: Option<String>,
    }

    let mut reader = Reader::from_str(xml);

    let mut depth = 0usize;
    let mut text = String::new();
    let mut item: Option<Item> = None;
    let mut out = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                depth += 1;
                if e.local_name().as_ref() == b"log-item" {
                    item = Some(Item::default());
                }
                text.clear();
            }
            Event::Text(t) => text.push_str(&t.unescape().map_err(xml_error)?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let value = std::mem::take(&mut text);
                let name = e.local_name();
                match name.as_ref() {
                    b"log-item" => {
                        if let Some(Item {
                            rev: Some(rev),
                            date,
                            author,
                            message,
                        }) = item.take()
                        {
                            out.push(Version::with_log(rev, date, author, message));
                        }
                    }
                    b"version-name" => {
                        if let Some(item) = item.as_mut() {
                            item.rev = value.trim().parse().ok();
                        }
                    }
                    b"date" => {
                        if let Some(item) = item.as_mut() {
                            item.date = non_empty(value);
                        }
                    }
                    b"creator-displayname" => {
                        if let Some(item) = item.as_mut() {
                            item.author = non_empty(value);
                        }
                    }
                    b"comment" => {
                        if let Some(item) = item.as_mut() {
                            item.message = Some(value);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(SvnError::Protocol("truncated log-report response".into()));
    }
    Ok(out)
}
