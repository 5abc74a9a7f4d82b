//! Resolution of anchors found in rendered answers.

use easychat_core::citation::{CITATION_HOST, CITATION_PATH, Citation};
use reqwest::Url;

/// What activating a link should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// A `[docN]` reference. Only PDF citations can be opened.
    Citation {
        index: usize,
        tooltip: String,
        viewable: bool,
    },
    /// A link to another site, opened in a new viewing context.
    External { href: String },
    /// A link on the page's own host (or a relative one); left as is.
    SameSite,
    /// A synthetic link that points nowhere.
    Inert,
}

/// Decide how the anchor `href` behaves for an answer citing `citations`.
///
/// `page_host` is the host the chat page is served from.
pub fn resolve_link(href: &str, page_host: &str, citations: &[Citation]) -> LinkAction {
    let Ok(url) = Url::parse(href) else {
        return LinkAction::SameSite;
    };

    match url.host_str() {
        Some(CITATION_HOST) => resolve_citation(&url, citations),
        Some(host) if host.eq_ignore_ascii_case(page_host) => LinkAction::SameSite,
        Some(_) => LinkAction::External {
            href: url.to_string(),
        },
        None => LinkAction::SameSite,
    }
}

fn resolve_citation(url: &Url, citations: &[Citation]) -> LinkAction {
    let citation = url
        .path()
        .strip_prefix(CITATION_PATH)
        .and_then(|index| index.parse::<usize>().ok())
        .and_then(|index| citations.get(index).map(|c| (index, c)));

    match citation {
        Some((index, citation)) => LinkAction::Citation {
            index,
            tooltip: citation.tooltip(),
            viewable: citation.is_pdf(),
        },
        None => LinkAction::Inert,
    }
}
