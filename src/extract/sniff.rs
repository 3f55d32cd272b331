//! Format sniffing
//!
//! Decides which extractor handles a file. The declared MIME type is
//! consulted first; the file extension only matters when the MIME type is
//! absent, generic, or not one we recognise.

use serde::Serialize;
use std::path::Path;

use crate::types::UploadedFile;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TXT_MIME: &str = "text/plain";

/// Document formats with a dedicated extraction path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
    /// Anything else; decoded as raw text
    Unknown,
}

impl DocumentFormat {
    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Unknown => "unknown",
        }
    }

    /// Match a declared MIME type. Parameters and case are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            PDF_MIME => Some(Self::Pdf),
            DOCX_MIME => Some(Self::Docx),
            TXT_MIME => Some(Self::Txt),
            _ => None,
        }
    }

    /// Match a file extension (without the dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Extensions accepted when walking directories
    pub fn supported_extensions() -> &'static [&'static str] {
        &["pdf", "docx", "txt"]
    }
}

/// Classify an uploaded file.
pub fn classify(file: &UploadedFile) -> DocumentFormat {
    classify_parts(file.mime.as_deref(), &file.name)
}

/// Classify from a declared MIME type and a file name.
pub fn classify_parts(mime: Option<&str>, name: &str) -> DocumentFormat {
    if let Some(format) = mime.and_then(DocumentFormat::from_mime) {
        return format;
    }

    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentFormat::from_extension)
        .unwrap_or(DocumentFormat::Unknown)
}

/// Whether a path has one of the supported extensions
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentFormat::from_extension)
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_fallback_is_case_insensitive() {
        assert_eq!(classify_parts(None, "report.PDF"), DocumentFormat::Pdf);
        assert_eq!(classify_parts(Some(""), "Thesis.DocX"), DocumentFormat::Docx);
    }

    #[test]
    fn test_mime_beats_extension() {
        assert_eq!(
            classify_parts(Some("application/pdf"), "notes.txt"),
            DocumentFormat::Pdf
        );
        assert_eq!(
            classify_parts(Some(DOCX_MIME), "scan.pdf"),
            DocumentFormat::Docx
        );
    }

    #[test]
    fn test_generic_mime_falls_back_to_extension() {
        assert_eq!(
            classify_parts(Some("application/octet-stream"), "paper.pdf"),
            DocumentFormat::Pdf
        );
    }

    #[test]
    fn test_mime_parameters_are_ignored() {
        assert_eq!(
            classify_parts(Some("Text/Plain; charset=utf-8"), "data.bin"),
            DocumentFormat::Txt
        );
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classify_parts(None, "slides.pptx"), DocumentFormat::Unknown);
        assert_eq!(classify_parts(None, "README"), DocumentFormat::Unknown);
        assert_eq!(
            classify_parts(Some("image/png"), "photo.png"),
            DocumentFormat::Unknown
        );
    }

    #[test]
    fn test_classify_uploaded_file() {
        let file = UploadedFile::new("notes.txt", Some("application/pdf"), Vec::new());
        assert_eq!(classify(&file), DocumentFormat::Pdf);
    }

    #[test]
    fn test_supported_path() {
        assert!(is_supported_path(Path::new("a/b/c.TXT")));
        assert!(!is_supported_path(Path::new("a/b/c.md")));
    }
}
