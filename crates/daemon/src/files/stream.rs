//! Read-only document streams.
//!
//! Only a [`ResolvedPath`] can be opened, so every stream is guaranteed to
//! point inside the documents root. Files are opened read-only without any
//! lock; other readers and writers are not blocked. The handle is owned by
//! [`DocumentStream`] and closed when it is dropped, whichever way the request
//! ends.

use std::io;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;

use super::error::DocumentError;
use super::resolver::ResolvedPath;

/// Chunk size used when streaming a document to a client (64KB).
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// An open document.
#[derive(Debug)]
pub struct DocumentStream {
    file: File,
    len: u64,
}

/// Open `resolved` for reading.
///
/// A file removed between resolution and open yields
/// [`DocumentError::NotFound`]. Nothing is retried.
pub async fn open_for_read(resolved: &ResolvedPath) -> Result<DocumentStream, DocumentError> {
    let classify = |e: io::Error| match e.kind() {
        io::ErrorKind::NotFound => DocumentError::NotFound(resolved.relative().to_string()),
        _ => DocumentError::from_io(e, resolved.as_path()),
    };

    let file = File::open(resolved.as_path()).await.map_err(classify)?;
    let metadata = file.metadata().await.map_err(classify)?;
    if !metadata.is_file() {
        return Err(DocumentError::NotFound(resolved.relative().to_string()));
    }

    Ok(DocumentStream {
        file,
        len: metadata.len(),
    })
}

/// Text read for preview, possibly cut at the size limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPreview {
    /// Decoded text. Invalid UTF-8 sequences are replaced.
    pub text: String,
    /// Whether the file was longer than the limit.
    pub truncated: bool,
}

impl DocumentStream {
    /// File size at open time.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the file was empty at open time.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Convert into a chunked byte stream for a response body.
    pub fn into_body_stream(self) -> ReaderStream<File> {
        ReaderStream::with_capacity(self.file, STREAM_CHUNK_SIZE)
    }

    /// Read at most `limit` bytes and decode them as UTF-8.
    pub async fn read_text(self, limit: u64) -> Result<TextPreview, DocumentError> {
        read_text_from(self.file, limit).await
    }
}

async fn read_text_from<R>(reader: R, limit: u64) -> Result<TextPreview, DocumentError>
where
    R: AsyncRead + Unpin,
{
    // One extra byte tells us whether anything was cut off
    let mut buffer = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut buffer)
        .await?;

    let truncated = buffer.len() as u64 > limit;
    if truncated {
        buffer.truncate(limit as usize);
    }

    Ok(TextPreview {
        text: String::from_utf8_lossy(&buffer).into_owned(),
        truncated,
    })
}
