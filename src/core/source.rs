//! Payload acquisition.
//!
//! Reading a payload is the only step of a creation that may suspend. A
//! [`PayloadSource`] produces the bytes, the original file name and the
//! declared media type; the workflow never sees where they came from.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use tokio::fs;

/// A fully-read payload ready for submission
#[derive(Debug, Clone)]
pub struct Payload {
    /// Original file name
    pub name: String,

    /// Payload bytes
    pub data: Bytes,

    /// Declared media type, if the source knows one
    pub media_type: Option<Mime>,
}

impl Payload {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>, media_type: Option<Mime>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            media_type,
        }
    }

    /// Parse a declared media type string; unparseable types become `None`
    pub fn with_declared_type(
        name: impl Into<String>,
        data: impl Into<Bytes>,
        declared: &str,
    ) -> Self {
        Self::new(name, data, declared.parse().ok())
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Something a payload can be read from
#[async_trait]
pub trait PayloadSource: Send + Sync {
    /// Human-readable description for logs
    fn describe(&self) -> String;

    /// Read the whole payload
    async fn read(&self) -> Result<Payload>;
}

/// Reads a payload from a file on disk
#[derive(Debug, Clone)]
pub struct FilePayloadSource {
    path: PathBuf,
    media_type: Option<Mime>,
}

impl FilePayloadSource {
    /// Source whose media type is guessed from the file extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let media_type = guess_media_type(&path);
        Self { path, media_type }
    }

    /// Override the declared media type
    pub fn with_media_type(mut self, media_type: Mime) -> Self {
        self.media_type = Some(media_type);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PayloadSource for FilePayloadSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn read(&self) -> Result<Payload> {
        let data = fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read payload: {}", self.path.display()))?;

        let name = self
            .path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(Payload::new(name, data, self.media_type.clone()))
    }
}

/// Payload already held in memory
#[async_trait]
impl PayloadSource for Payload {
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn read(&self) -> Result<Payload> {
        Ok(self.clone())
    }
}

/// Guess a media type from a file extension
pub fn guess_media_type(path: &Path) -> Option<Mime> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let essence = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => return None,
    };
    essence.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_media_type() {
        assert_eq!(
            guess_media_type(Path::new("a/photo.JPG")),
            Some(mime::IMAGE_JPEG)
        );
        assert_eq!(
            guess_media_type(Path::new("clip.mov")).map(|m| m.to_string()),
            Some("video/quicktime".to_string())
        );
        assert_eq!(guess_media_type(Path::new("noext")), None);
        assert_eq!(guess_media_type(Path::new("x.unknown")), None);
    }

    #[test]
    fn test_declared_type_parsing() {
        let payload = Payload::with_declared_type("a.png", &b"x"[..], "image/png");
        assert_eq!(payload.media_type, Some(mime::IMAGE_PNG));

        let payload = Payload::with_declared_type("a.bin", &b"x"[..], "not a type");
        assert_eq!(payload.media_type, None);
    }

    #[tokio::test]
    async fn test_file_source_reads_payload() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("clip.webm");
        tokio::fs::write(&path, b"webm bytes").await.unwrap();

        let payload = FilePayloadSource::new(&path).read().await.unwrap();
        assert_eq!(payload.name, "clip.webm");
        assert_eq!(payload.len(), 10);
        assert_eq!(payload.media_type.map(|m| m.to_string()), Some("video/webm".to_string()));
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let source = FilePayloadSource::new("/definitely/not/here.png");
        assert!(source.read().await.is_err());
    }
}
