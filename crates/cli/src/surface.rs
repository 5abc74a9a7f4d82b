//! A document surface that writes PDFs to disk.

use async_trait::async_trait;
use easychat_core::document::Document;
use easychat_core::error::{DocumentError, Error, Result};
use easychat_core::view::DocumentSurface;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Saves presented documents into a directory instead of rendering them.
pub struct FileSurface {
    dir: PathBuf,
    /// File name for the next document
    target: Mutex<String>,
    /// Where the last document was written
    saved: Mutex<Option<PathBuf>>,
}

impl FileSurface {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            target: Mutex::new("document.pdf".into()),
            saved: Mutex::new(None),
        }
    }

    /// Name the next document after the last segment of its blob path.
    pub fn prepare(&self, blob: &str) {
        let name = blob
            .rsplit('/')
            .next()
            .filter(|n| !n.is_empty())
            .unwrap_or("document.pdf");
        *self.target.lock().unwrap_or_else(|e| e.into_inner()) = name.to_string();
    }

    pub fn saved_path(&self) -> Option<PathBuf> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn target_path(&self) -> PathBuf {
        let name = self.target.lock().unwrap_or_else(|e| e.into_inner()).clone();
        self.dir.join(name)
    }
}

/// Count page objects in a PDF body.
///
/// Matches `/Type /Page` and `/Type/Page`, skipping `/Pages` tree nodes.
/// Compressed object streams hide their pages; those documents count as 0.
pub fn count_pages(data: &[u8]) -> u32 {
    let mut count = 0;
    for marker in [b"/Type /Page".as_slice(), b"/Type/Page".as_slice()] {
        let mut rest = data;
        while let Some(pos) = find(rest, marker) {
            let after = &rest[pos + marker.len()..];
            if after.first() != Some(&b's') {
                count += 1;
            }
            rest = after;
        }
    }
    count
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await
}

#[async_trait]
impl DocumentSurface for FileSurface {
    fn open(&self) {
        eprint!("  Loading document...");
    }

    fn close(&self) {
        eprint!("\r                     \r");
    }

    async fn present(&self, document: &Document) -> Result<u32> {
        let path = self.target_path();
        write_file(&path, &document.data)
            .await
            .map_err(|e| Error::from(DocumentError::Presentation(format!("{}: {e}", path.display()))))?;

        let pages = count_pages(&document.data);
        self.close();
        println!("  Saved {} ({} bytes, {pages} pages)", path.display(), document.len());
        info!(path = %path.display(), pages, "Document saved");

        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(path);
        Ok(pages)
    }

    fn scroll_to_page(&self, page: u32) {
        println!("  Cited page: {page}");
    }
}
