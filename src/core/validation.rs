//! Per-kind validation of candidate content.
//!
//! Rules are evaluated in a fixed order and the first failing rule wins:
//! 1. Title must be non-empty after trimming
//! 2. Text: non-empty after trimming, then the text size ceiling
//! 3. Binary: the kind's size ceiling (image is capped lower than video/file)
//! 4. Image/video: the declared media subtype must be on the kind's allow-list
//!
//! Validation has no side effects.

use mime::Mime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ContentKind;

const MIB: u64 = 1024 * 1024;

/// Image subtypes accepted for [`ContentKind::Image`]
pub const IMAGE_SUBTYPES: &[&str] = &["jpeg", "png", "gif", "webp"];

/// Video subtypes accepted for [`ContentKind::Video`] (avi and mov under
/// their registered and legacy names)
pub const VIDEO_SUBTYPES: &[&str] = &["mp4", "webm", "x-msvideo", "avi", "msvideo", "quicktime"];

/// Size ceilings per kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLimits {
    /// Maximum UTF-8 length of a text entry (default: 5MB)
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: u64,

    /// Maximum image payload (default: 10MB)
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    /// Maximum video or generic payload (default: 50MB)
    #[serde(default = "default_max_binary_bytes")]
    pub max_binary_bytes: u64,
}

fn default_max_text_bytes() -> u64 {
    5 * MIB
}
fn default_max_image_bytes() -> u64 {
    10 * MIB
}
fn default_max_binary_bytes() -> u64 {
    50 * MIB
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_text_bytes: default_max_text_bytes(),
            max_image_bytes: default_max_image_bytes(),
            max_binary_bytes: default_max_binary_bytes(),
        }
    }
}

/// Content offered for validation
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    /// Typed or decoded text buffer
    Text(&'a str),

    /// Binary payload, described by length and declared media type
    Payload {
        len: u64,
        media_type: Option<&'a Mime>,
    },
}

/// Why a candidate (or its commit) was refused
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum Rejection {
    #[error("A title is required")]
    MissingTitle,

    #[error("Content is empty")]
    EmptyContent,

    #[error("Content too large: {actual} bytes > {limit} bytes")]
    TooLarge { actual: u64, limit: u64 },

    #[error("Unsupported format: {media_type}")]
    UnsupportedFormat { media_type: String },

    #[error("Could not allocate resources: {message}")]
    ResourceError { message: String },

    #[error("Could not read content: {message}")]
    ReadFailed { message: String },
}

impl ValidationLimits {
    /// Size ceiling that applies to a kind
    pub fn limit_for(&self, kind: ContentKind) -> u64 {
        match kind {
            ContentKind::Text => self.max_text_bytes,
            ContentKind::Image => self.max_image_bytes.min(self.max_binary_bytes),
            ContentKind::Video | ContentKind::Generic => self.max_binary_bytes,
        }
    }

    /// Validate a candidate for `kind` under `title`
    pub fn validate(
        &self,
        kind: ContentKind,
        title: &str,
        candidate: Candidate<'_>,
    ) -> Result<(), Rejection> {
        if title.trim().is_empty() {
            return Err(Rejection::MissingTitle);
        }

        match (kind, candidate) {
            (ContentKind::Text, Candidate::Text(text)) => {
                if text.trim().is_empty() {
                    return Err(Rejection::EmptyContent);
                }
                self.check_size(kind, text.len() as u64)
            }
            (ContentKind::Text, Candidate::Payload { media_type, .. }) => {
                Err(Rejection::UnsupportedFormat {
                    media_type: describe(media_type),
                })
            }
            (_, Candidate::Text(_)) => Err(Rejection::UnsupportedFormat {
                media_type: mime::TEXT_PLAIN.to_string(),
            }),
            (_, Candidate::Payload { len, media_type }) => {
                self.check_size(kind, len)?;
                check_format(kind, media_type)
            }
        }
    }

    fn check_size(&self, kind: ContentKind, actual: u64) -> Result<(), Rejection> {
        let limit = self.limit_for(kind);
        if actual > limit {
            return Err(Rejection::TooLarge { actual, limit });
        }
        Ok(())
    }
}

/// Check the declared media type against the kind's allow-list
fn check_format(kind: ContentKind, media_type: Option<&Mime>) -> Result<(), Rejection> {
    let (top, allowed) = match kind {
        ContentKind::Image => (mime::IMAGE, IMAGE_SUBTYPES),
        ContentKind::Video => (mime::VIDEO, VIDEO_SUBTYPES),
        ContentKind::Text | ContentKind::Generic => return Ok(()),
    };

    let accepted = media_type.is_some_and(|m| {
        m.type_() == top
            && allowed
                .iter()
                .any(|sub| m.subtype().as_str().eq_ignore_ascii_case(sub))
    });

    if accepted {
        Ok(())
    } else {
        Err(Rejection::UnsupportedFormat {
            media_type: describe(media_type),
        })
    }
}

fn describe(media_type: Option<&Mime>) -> String {
    media_type
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: u64, media_type: &Mime) -> Candidate<'_> {
        Candidate::Payload {
            len,
            media_type: Some(media_type),
        }
    }

    #[test]
    fn test_default_limits() {
        let limits = ValidationLimits::default();
        assert_eq!(limits.limit_for(ContentKind::Text), 5 * MIB);
        assert_eq!(limits.limit_for(ContentKind::Image), 10 * MIB);
        assert_eq!(limits.limit_for(ContentKind::Video), 50 * MIB);
        assert_eq!(limits.limit_for(ContentKind::Generic), 50 * MIB);
    }

    #[test]
    fn test_title_checked_first() {
        let limits = ValidationLimits::default();
        let result = limits.validate(ContentKind::Text, "   ", Candidate::Text(""));
        assert_eq!(result, Err(Rejection::MissingTitle));
    }

    #[test]
    fn test_text_rules() {
        let limits = ValidationLimits {
            max_text_bytes: 8,
            ..Default::default()
        };

        assert!(limits
            .validate(ContentKind::Text, "t", Candidate::Text("hello"))
            .is_ok());
        assert_eq!(
            limits.validate(ContentKind::Text, "t", Candidate::Text(" \n\t ")),
            Err(Rejection::EmptyContent)
        );
        assert_eq!(
            limits.validate(ContentKind::Text, "t", Candidate::Text("ééééé")),
            Err(Rejection::TooLarge {
                actual: 10,
                limit: 8
            })
        );
    }

    #[test]
    fn test_image_allow_list() {
        let limits = ValidationLimits::default();
        let png: Mime = "image/png".parse().unwrap();
        let svg: Mime = "image/svg+xml".parse().unwrap();
        let pdf: Mime = "application/pdf".parse().unwrap();

        assert!(limits.validate(ContentKind::Image, "t", payload(10, &png)).is_ok());
        assert!(matches!(
            limits.validate(ContentKind::Image, "t", payload(10, &svg)),
            Err(Rejection::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            limits.validate(ContentKind::Image, "t", payload(10, &pdf)),
            Err(Rejection::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            limits.validate(
                ContentKind::Image,
                "t",
                Candidate::Payload {
                    len: 10,
                    media_type: None
                }
            ),
            Err(Rejection::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_size_checked_before_format() {
        let limits = ValidationLimits::default();
        let svg: Mime = "image/svg+xml".parse().unwrap();

        let result = limits.validate(ContentKind::Image, "t", payload(10 * MIB + 1, &svg));
        assert!(matches!(result, Err(Rejection::TooLarge { .. })));
    }

    #[test]
    fn test_video_allow_list() {
        let limits = ValidationLimits::default();
        for media_type in ["video/mp4", "video/webm", "video/x-msvideo", "video/quicktime"] {
            let m: Mime = media_type.parse().unwrap();
            assert!(
                limits.validate(ContentKind::Video, "t", payload(1, &m)).is_ok(),
                "{} should be accepted",
                media_type
            );
        }

        let ogg: Mime = "video/ogg".parse().unwrap();
        assert!(limits.validate(ContentKind::Video, "t", payload(1, &ogg)).is_err());
    }

    #[test]
    fn test_generic_accepts_any_format() {
        let limits = ValidationLimits::default();
        assert!(limits
            .validate(
                ContentKind::Generic,
                "t",
                Candidate::Payload {
                    len: 0,
                    media_type: None
                }
            )
            .is_ok());
    }

    #[test]
    fn test_text_for_binary_kind_is_unsupported() {
        let limits = ValidationLimits::default();
        let result = limits.validate(ContentKind::Image, "t", Candidate::Text("hi"));
        assert!(matches!(result, Err(Rejection::UnsupportedFormat { .. })));
    }
}
