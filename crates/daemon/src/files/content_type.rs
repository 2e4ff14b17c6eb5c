//! Extension to MIME type mapping.
//!
//! The served document types are a closed set. [`DocumentKind`] names them,
//! [`EXTENSIONS`] maps file extensions onto them, and the listing allow-list is
//! exactly the set of extensions in that table.

use protocol::file_type_of;

/// MIME type returned for anything not in the table.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// The document types the daemon knows how to label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Plain text.
    Text,
    /// PDF document.
    Pdf,
    /// JPEG image.
    Jpeg,
    /// PNG image.
    Png,
    /// Word document.
    Docx,
    /// Excel workbook.
    Xlsx,
    /// PowerPoint presentation.
    Pptx,
}

/// Lowercased extension (with dot) to document kind.
pub const EXTENSIONS: &[(&str, DocumentKind)] = &[
    (".txt", DocumentKind::Text),
    (".pdf", DocumentKind::Pdf),
    (".jpg", DocumentKind::Jpeg),
    (".jpeg", DocumentKind::Jpeg),
    (".png", DocumentKind::Png),
    (".docx", DocumentKind::Docx),
    (".xlsx", DocumentKind::Xlsx),
    (".pptx", DocumentKind::Pptx),
];

impl DocumentKind {
    /// Look up a kind by extension. Case-insensitive; the leading dot is optional.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_lowercase();
        let dotted = if extension.starts_with('.') {
            extension
        } else {
            format!(".{}", extension)
        };

        EXTENSIONS
            .iter()
            .find(|(ext, _)| *ext == dotted)
            .map(|(_, kind)| *kind)
    }

    /// Look up a kind from a file name or path.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Self::from_extension(&file_type_of(file_name))
    }

    /// MIME type for this kind.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }

    /// Whether the preview endpoint renders this kind as text.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

/// MIME type for `file_name`. Total: unknown or missing extensions map to
/// [`DEFAULT_CONTENT_TYPE`].
pub fn content_type(file_name: &str) -> &'static str {
    DocumentKind::from_file_name(file_name)
        .map(|kind| kind.mime())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Whether the flat listing includes files with this extension.
pub fn is_allowed_extension(extension: &str) -> bool {
    DocumentKind::from_extension(extension).is_some()
}
