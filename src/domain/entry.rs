//! Catalog entries and their content kinds.
//!
//! An entry is built once, at commit time, and never mutated afterwards.
//! Its content is a tagged variant per kind so that a text entry can never
//! carry a preview handle and an image can never carry a text buffer.

use std::collections::BTreeSet;
use std::fmt;

use bytes::Bytes;
use mime::Mime;
use serde::{Deserialize, Serialize};

use crate::core::resources::Handle;

/// Catalog-assigned entry identifier.
///
/// Assigned from a per-store counter that is never rewound, so an id is
/// never reused after its entry is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntryId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let raw = s
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("Invalid entry id: {}", s))?;
        Ok(Self(raw))
    }
}

/// Declared category of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Still image with a preview handle
    Image,

    /// Video with a playback handle
    Video,

    /// UTF-8 text typed or uploaded by the user
    Text,

    /// Any other file
    Generic,
}

impl ContentKind {
    /// All kinds, in the order the view offers them
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Image,
        ContentKind::Video,
        ContentKind::Text,
        ContentKind::Generic,
    ];

    /// Canonical lowercase name, also the sort key for kind ordering
    pub fn name(self) -> &'static str {
        match self {
            ContentKind::Image => "image",
            ContentKind::Video => "video",
            ContentKind::Text => "text",
            ContentKind::Generic => "file",
        }
    }

    /// File-picker filter the view should apply for this kind
    pub fn accept(self) -> &'static str {
        match self {
            ContentKind::Image => "image/*",
            ContentKind::Video => "video/*",
            ContentKind::Text => ".txt,.md",
            ContentKind::Generic => "*",
        }
    }

    /// Short user-facing hint shown next to the content input
    pub fn description(self) -> &'static str {
        match self {
            ContentKind::Image => "Select an image file (jpeg, png, gif, webp)",
            ContentKind::Video => "Select a video file (mp4, webm, avi, mov)",
            ContentKind::Text => "Type your text or upload a text file",
            ContentKind::Generic => "Upload any kind of file",
        }
    }

    /// Whether content for this kind arrives as a binary payload
    pub fn is_binary(self) -> bool {
        !matches!(self, ContentKind::Text)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "image" | "img" => Ok(ContentKind::Image),
            "video" | "vid" => Ok(ContentKind::Video),
            "text" | "texte" | "txt" => Ok(ContentKind::Text),
            "file" | "fichier" | "generic" => Ok(ContentKind::Generic),
            _ => anyhow::bail!("Unknown content kind: {}", s),
        }
    }
}

/// Per-kind content of a committed entry
#[derive(Debug, Clone)]
pub enum EntryContent {
    Image {
        data: Bytes,
        media_type: Mime,
        preview: Handle,
    },
    Video {
        data: Bytes,
        media_type: Mime,
        playback: Handle,
    },
    Text {
        text: String,
    },
    Generic {
        data: Bytes,
        media_type: Option<Mime>,
    },
}

impl EntryContent {
    /// Kind implied by the variant
    pub fn kind(&self) -> ContentKind {
        match self {
            EntryContent::Image { .. } => ContentKind::Image,
            EntryContent::Video { .. } => ContentKind::Video,
            EntryContent::Text { .. } => ContentKind::Text,
            EntryContent::Generic { .. } => ContentKind::Generic,
        }
    }

    /// Measured byte length of the payload or UTF-8 text buffer
    pub fn byte_len(&self) -> u64 {
        match self {
            EntryContent::Image { data, .. }
            | EntryContent::Video { data, .. }
            | EntryContent::Generic { data, .. } => data.len() as u64,
            EntryContent::Text { text } => text.len() as u64,
        }
    }

    /// Every handle owned by this content
    pub fn handles(&self) -> impl Iterator<Item = &Handle> {
        let handle = match self {
            EntryContent::Image { preview, .. } => Some(preview),
            EntryContent::Video { playback, .. } => Some(playback),
            EntryContent::Text { .. } | EntryContent::Generic { .. } => None,
        };
        handle.into_iter()
    }
}

/// A committed catalog entry.
///
/// Fields are private; an entry can only be produced by
/// [`CatalogStore::insert`](crate::library::CatalogStore::insert).
#[derive(Debug, Clone)]
pub struct ContentEntry {
    id: EntryId,
    title: String,
    original_name: String,
    size_bytes: u64,
    created_at_millis: i64,
    content: EntryContent,
    tags: BTreeSet<String>,
}

impl ContentEntry {
    pub(crate) fn new(
        id: EntryId,
        title: String,
        original_name: String,
        created_at_millis: i64,
        content: EntryContent,
        tags: BTreeSet<String>,
    ) -> Self {
        let size_bytes = content.byte_len();
        Self {
            id,
            title,
            original_name,
            size_bytes,
            created_at_millis,
            content,
            tags,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Uploaded file name, or `<title>.txt` for typed text
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn kind(&self) -> ContentKind {
        self.content.kind()
    }

    /// Byte length measured at commit; never recomputed
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn created_at_millis(&self) -> i64 {
        self.created_at_millis
    }

    pub fn content(&self) -> &EntryContent {
        &self.content
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Text buffer, for text entries
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            EntryContent::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Binary payload, for image, video and generic entries
    pub fn payload(&self) -> Option<&Bytes> {
        match &self.content {
            EntryContent::Image { data, .. }
            | EntryContent::Video { data, .. }
            | EntryContent::Generic { data, .. } => Some(data),
            EntryContent::Text { .. } => None,
        }
    }

    /// Declared media type of a binary payload, when known
    pub fn media_type(&self) -> Option<&Mime> {
        match &self.content {
            EntryContent::Image { media_type, .. } | EntryContent::Video { media_type, .. } => {
                Some(media_type)
            }
            EntryContent::Generic { media_type, .. } => media_type.as_ref(),
            EntryContent::Text { .. } => None,
        }
    }

    pub fn preview_handle(&self) -> Option<&Handle> {
        match &self.content {
            EntryContent::Image { preview, .. } => Some(preview),
            _ => None,
        }
    }

    pub fn playback_handle(&self) -> Option<&Handle> {
        match &self.content {
            EntryContent::Video { playback, .. } => Some(playback),
            _ => None,
        }
    }

    /// Serializable metadata view (no payload bytes)
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id,
            title: self.title.clone(),
            original_name: self.original_name.clone(),
            kind: self.kind(),
            size_bytes: self.size_bytes,
            created_at_millis: self.created_at_millis,
            media_type: self.media_type().map(|m| m.to_string()),
            preview: self.preview_handle().map(|h| h.reference()),
            playback: self.playback_handle().map(|h| h.reference()),
            tags: self.tags.iter().cloned().collect(),
        }
    }
}

impl PartialEq for ContentEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContentEntry {}

/// Metadata of an entry as handed to the view layer or printed as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub id: EntryId,
    pub title: String,
    pub original_name: String,
    pub kind: ContentKind,
    pub size_bytes: u64,
    pub created_at_millis: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_from_str() {
        assert_eq!("image".parse::<ContentKind>().unwrap(), ContentKind::Image);
        assert_eq!("IMG".parse::<ContentKind>().unwrap(), ContentKind::Image);
        assert_eq!("texte".parse::<ContentKind>().unwrap(), ContentKind::Text);
        assert_eq!("fichier".parse::<ContentKind>().unwrap(), ContentKind::Generic);
        assert_eq!("video".parse::<ContentKind>().unwrap(), ContentKind::Video);
        assert!("audio".parse::<ContentKind>().is_err());
    }

    #[test]
    fn test_content_kind_descriptors() {
        assert_eq!(ContentKind::Image.accept(), "image/*");
        assert_eq!(ContentKind::Generic.accept(), "*");
        assert_eq!(ContentKind::Generic.name(), "file");
        assert!(!ContentKind::Text.is_binary());
        assert!(ContentKind::Video.is_binary());
    }

    #[test]
    fn test_text_entry_accessors() {
        let entry = ContentEntry::new(
            EntryId::new(7),
            "Notes".to_string(),
            "Notes.txt".to_string(),
            1_000,
            EntryContent::Text {
                text: "héllo".to_string(),
            },
            BTreeSet::new(),
        );

        assert_eq!(entry.kind(), ContentKind::Text);
        assert_eq!(entry.size_bytes(), 6); // é is two bytes
        assert_eq!(entry.text(), Some("héllo"));
        assert!(entry.payload().is_none());
        assert!(entry.preview_handle().is_none());

        let summary = entry.summary();
        assert_eq!(summary.id, EntryId::new(7));
        assert!(summary.tags.is_empty());
        assert!(summary.preview.is_none());
    }

    #[test]
    fn test_entry_id_parse() {
        assert_eq!("42".parse::<EntryId>().unwrap(), EntryId::new(42));
        assert!("x".parse::<EntryId>().is_err());
    }
}
