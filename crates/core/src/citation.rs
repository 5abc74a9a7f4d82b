//! Citations attached to an assistant turn.
//!
//! The backend attaches a list of citations to the first frame of every
//! assistant reply. The rendered markdown refers to them through synthetic
//! reference links (`[doc1]`, `[doc2]`, ...) that point at
//! `https://easy-chat-bot/citation/{index}`.

use crate::document::StorageLocator;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;

/// Host of the synthetic citation URLs embedded in rendered answers.
pub const CITATION_HOST: &str = "easy-chat-bot";

/// Path prefix of the synthetic citation URLs.
pub const CITATION_PATH: &str = "/citation/";

static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_pages_(\d+)").expect("page marker pattern is valid")
});

/// A structured reference to a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: String,

    /// Chunk identifier as indexed by the search backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,

    /// Zero-based page numbers
    #[serde(default, deserialize_with = "deserialize_pages")]
    pub pages: Vec<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storageaccount_blob: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storageaccount_container: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storageaccount_name: Option<String>,
}

impl Citation {
    /// Whether this citation can be opened in the document viewer.
    pub fn is_pdf(&self) -> bool {
        self.url.ends_with(".pdf")
    }

    /// The storage locator, when all three identifiers are present.
    pub fn storage_locator(&self) -> Option<StorageLocator> {
        Some(StorageLocator {
            blob: self.storageaccount_blob.clone()?,
            container: self.storageaccount_container.clone()?,
            account: self.storageaccount_name.clone()?,
        })
    }

    /// Hover text: the title plus the cited pages, 1-based.
    ///
    /// `pages: [2]` renders `"Title (page 3)"`, `pages: [2, 5]` renders
    /// `"Title (pages 3, 6)"`.
    pub fn tooltip(&self) -> String {
        let mut tooltip = self.title.clone();
        if self.pages.is_empty() {
            return tooltip;
        }
        let pages = self
            .pages
            .iter()
            .map(|p| (u64::from(*p) + 1).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let noun = if self.pages.len() == 1 { "page" } else { "pages" };
        tooltip.push_str(&format!(" ({noun} {pages})"));
        tooltip
    }

    /// First cited page (zero-based), if any.
    pub fn first_page(&self) -> Option<u32> {
        self.pages.first().copied()
    }

    /// Fill in fields the backend did not resolve.
    ///
    /// Pages come from `_pages_{n}` markers in `filepath`; the storage
    /// locator comes from a `http(s)://{account}.../{container}/{blob}` url.
    /// Fields that are already present are left untouched.
    pub fn normalize(mut self) -> Self {
        if self.pages.is_empty()
            && let Some(filepath) = &self.filepath
        {
            self.pages = PAGE_MARKER
                .captures_iter(filepath)
                .filter_map(|c| c[1].parse().ok())
                .collect();
        }

        if self.storageaccount_blob.is_none()
            && let Some(locator) = locator_from_url(&self.url)
        {
            self.storageaccount_name = Some(locator.account);
            self.storageaccount_container = Some(locator.container);
            self.storageaccount_blob = Some(locator.blob);
        }

        self
    }
}

/// Synthetic link target for the citation at `index`.
pub fn citation_href(index: usize) -> String {
    format!("https://{CITATION_HOST}{CITATION_PATH}{index}")
}

/// Markdown reference definitions for every citation, one per line.
pub fn reference_footer(citations: &[Citation]) -> String {
    citations
        .iter()
        .enumerate()
        .map(|(i, _)| format!("[doc{}]: {}\n", i + 1, citation_href(i)))
        .collect()
}

fn locator_from_url(url: &str) -> Option<StorageLocator> {
    let lower = url.to_ascii_lowercase();
    let scheme = ["https://", "http://"]
        .into_iter()
        .find(|scheme| lower.starts_with(scheme))?;
    let rest = url[scheme.len()..].split(['?', '#']).next().unwrap_or_default();

    let mut parts = rest.splitn(3, '/');
    let authority = parts.next()?;
    let container = parts.next()?;
    let blob = parts.next()?;

    // `user@account.host:port` keeps only the first DNS label.
    let host = authority.rsplit('@').next().unwrap_or_default();
    let account = host.split(['.', ':']).next().unwrap_or_default();
    if account.is_empty() || container.is_empty() || blob.is_empty() {
        return None;
    }
    Some(StorageLocator {
        account: account.to_string(),
        container: container.to_string(),
        blob: percent_decode(blob),
    })
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2]))
        {
            out.push(hi << 4 | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Accepts `[2, 5]`, `["2", "5"]` or `null`.
fn deserialize_pages<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Page {
        Number(u32),
        Text(String),
    }

    let raw: Option<Vec<Page>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|p| match p {
            Page::Number(n) => Ok(n),
            Page::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid page number: {s}"))),
        })
        .collect()
}
