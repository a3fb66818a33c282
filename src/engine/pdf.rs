//! PDF engine backed by `lopdf`.
//!
//! A section is one page. Labels come from the document's page label tree,
//! extraction writes a copy of the document with every other page removed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::{Document, Object};

use super::page_labels::PageLabels;
use super::{DocumentEngine, EngineError};

const PDF_SUFFIX: &str = ".pdf";

/// Splits PDF documents page by page.
#[derive(Debug, Default, Clone)]
pub struct PdfEngine;

impl PdfEngine {
    pub fn new() -> Self {
        Self
    }
}

/// A loaded PDF document.
#[derive(Debug)]
pub struct PdfSession {
    path: PathBuf,
    document: Arc<Document>,
    labels: PageLabels,
    page_count: usize,
}

impl PdfSession {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentEngine for PdfEngine {
    type Session = PdfSession;

    fn name(&self) -> &str {
        "pdf"
    }

    async fn open(&self, path: &Path) -> Result<PdfSession, EngineError> {
        let owned = path.to_path_buf();
        let open_error = |reason: String| EngineError::Open {
            path: path.to_path_buf(),
            reason,
        };

        let document = tokio::task::spawn_blocking(move || Document::load(owned))
            .await
            .map_err(|e| open_error(e.to_string()))?
            .map_err(|e| open_error(e.to_string()))?;

        let labels = PageLabels::from_document(&document);
        let page_count = document.get_pages().len();

        crate::debug_event!(
            "pdf",
            "loaded",
            "{} ({page_count} pages, labelled: {})",
            path.display(),
            !labels.is_empty()
        );

        Ok(PdfSession {
            path: path.to_path_buf(),
            document: Arc::new(document),
            labels,
            page_count,
        })
    }

    async fn is_ready(&self, _session: &PdfSession) -> bool {
        // Loading is synchronous, so an opened session is always usable
        true
    }

    fn document_name(&self, session: &PdfSession) -> Result<String, EngineError> {
        let file_name = session
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| EngineError::Query {
                operation: "document_name",
                reason: format!("{} has no file name", session.path.display()),
            })?;

        Ok(strip_pdf_suffix(&file_name).to_string())
    }

    fn section_count(&self, session: &PdfSession) -> Result<usize, EngineError> {
        Ok(session.page_count)
    }

    fn section_label(&self, session: &PdfSession, index: usize) -> Result<String, EngineError> {
        if index >= session.page_count {
            return Err(EngineError::Query {
                operation: "section_label",
                reason: format!(
                    "page {index} out of range ({} pages)",
                    session.page_count
                ),
            });
        }
        Ok(session.labels.label(index))
    }

    async fn extract_section(
        &self,
        session: &PdfSession,
        index: usize,
        destination: &Path,
    ) -> Result<(), EngineError> {
        let extract_error = |reason: String| EngineError::Extract {
            index,
            destination: destination.to_path_buf(),
            reason,
        };

        if index >= session.page_count {
            return Err(extract_error(format!(
                "page {index} out of range ({} pages)",
                session.page_count
            )));
        }

        let document = Arc::clone(&session.document);
        let target = destination.to_path_buf();
        tokio::task::spawn_blocking(move || write_single_page(&document, index, &target))
            .await
            .map_err(|e| extract_error(e.to_string()))?
            .map_err(|e| extract_error(e.to_string()))
    }

    async fn close(&self, session: PdfSession, commit: bool) {
        let state = if commit { "committed" } else { "abandoned" };
        crate::debug_event!("pdf", state, "{}", session.path.display());
    }
}

/// Strip a trailing `.pdf` (any case).
fn strip_pdf_suffix(file_name: &str) -> &str {
    let split = file_name.len().saturating_sub(PDF_SUFFIX.len());
    match (file_name.get(..split), file_name.get(split..)) {
        (Some(stem), Some(suffix)) if suffix.eq_ignore_ascii_case(PDF_SUFFIX) => stem,
        _ => file_name,
    }
}

fn write_single_page(source: &Document, index: usize, destination: &Path) -> lopdf::Result<()> {
    let mut doc = source.clone();
    let keep = index as u32 + 1;
    let others: Vec<u32> = doc
        .get_pages()
        .keys()
        .copied()
        .filter(|&page| page != keep)
        .collect();
    doc.delete_pages(&others);

    // Labels of the original page range no longer apply
    if let Ok(root) = doc.trailer.get(b"Root").and_then(Object::as_reference) {
        if let Ok(Object::Dictionary(catalog)) = doc.get_object_mut(root) {
            catalog.remove(b"PageLabels");
        }
    }

    doc.prune_objects();
    doc.save(destination)?;
    Ok(())
}
