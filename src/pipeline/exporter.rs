//! Section export: one output file per section, in section order.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::session::DocumentSession;
use crate::engine::{DocumentEngine, EngineError};

/// One section of the document being exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    /// 0-based section index.
    pub index: usize,
    /// Label as reported by the engine.
    pub raw_label: String,
    /// File-name part derived from the label.
    pub sanitized_name: String,
}

impl SectionRecord {
    pub fn new(index: usize, raw_label: impl Into<String>) -> Self {
        let raw_label = raw_label.into();
        let sanitized_name = sanitize_label(&raw_label);
        Self {
            index,
            raw_label,
            sanitized_name,
        }
    }
}

/// Section name used for output files: the label up to its first colon.
///
/// Path separators are replaced so the name stays inside the output directory.
pub fn sanitize_label(raw_label: &str) -> String {
    let name = raw_label.split(':').next().unwrap_or_default();
    name.replace(['/', '\\'], "_")
}

/// A file written for one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub section: SectionRecord,
    pub path: PathBuf,
}

/// Result of a fully exported document.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub document_name: String,
    pub artifacts: Vec<OutputArtifact>,
}

/// Export stopped early. Sections written before the failure stay on disk.
#[derive(Error, Debug)]
#[error("Export stopped after {} section(s): {source}", .written.len())]
pub struct ExportFailure {
    pub written: Vec<OutputArtifact>,
    #[source]
    pub source: EngineError,
}

/// Drives the engine across every section of one document.
#[derive(Debug, Clone)]
pub struct SectionExporter {
    output_dir: PathBuf,
    extension: String,
}

impl SectionExporter {
    pub fn new(output_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `{output_dir}/{document_name}{section_name}.{extension}`
    pub fn artifact_path(&self, document_name: &str, section_name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{document_name}{section_name}.{}", self.extension))
    }

    /// Export sections `0..count` in ascending order.
    ///
    /// Two sections with the same name write the same path; the later one wins.
    /// The source document is never modified.
    pub async fn export<E: DocumentEngine>(
        &self,
        session: &DocumentSession<E>,
    ) -> Result<ExportReport, ExportFailure> {
        let engine = session.engine();
        let handle = session.handle();
        let mut written = Vec::new();

        let fail = |written: Vec<OutputArtifact>, source: EngineError| ExportFailure {
            written,
            source,
        };

        let document_name = match engine.document_name(handle) {
            Ok(name) => name,
            Err(e) => return Err(fail(written, e)),
        };
        let count = match engine.section_count(handle) {
            Ok(count) => count,
            Err(e) => return Err(fail(written, e)),
        };

        crate::log_event!(
            "export",
            "document",
            "{document_name} has {count} section(s)"
        );

        for index in 0..count {
            let raw_label = match engine.section_label(handle, index) {
                Ok(label) => label,
                Err(e) => return Err(fail(written, e)),
            };
            let section = SectionRecord::new(index, raw_label);
            let path = self.artifact_path(&document_name, &section.sanitized_name);

            if let Err(e) = engine.extract_section(handle, index, &path).await {
                return Err(fail(written, e));
            }

            crate::debug_event!(
                "export",
                "section",
                "{} '{}' -> {}",
                index + 1,
                section.raw_label,
                path.display()
            );
            written.push(OutputArtifact { section, path });
        }

        Ok(ExportReport {
            document_name,
            artifacts: written,
        })
    }
}
