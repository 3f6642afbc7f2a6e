use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Photo => "PHOTO",
            MediaKind::Video => "VIDEO",
        }
    }

    pub fn parse(raw: &str) -> Option<MediaKind> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "photo" | "image" | "picture" => Some(MediaKind::Photo),
            "video" | "movie" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A captured photo or video. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    reference: String,
    kind: MediaKind,
    captured_at: DateTime<Utc>,
}

impl MediaItem {
    pub fn new(reference: impl Into<String>, kind: MediaKind) -> Self {
        Self::captured_at(reference, kind, Utc::now())
    }

    pub fn captured_at(
        reference: impl Into<String>,
        kind: MediaKind,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reference: reference.into(),
            kind,
            captured_at,
        }
    }

    /// Local file path (or opaque reference) of the captured file.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.reference)
    }

    pub fn file_exists(&self) -> bool {
        self.path().is_file()
    }

    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.reference.clone())
    }

    /// MIME type guessed from the extension, falling back to the media kind.
    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .path()
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "mp4" => "video/mp4",
            "avi" => "video/x-msvideo",
            _ => match self.kind {
                MediaKind::Photo => "image/jpeg",
                MediaKind::Video => "video/mp4",
            },
        }
    }

    /// Best-effort removal of the underlying file.
    ///
    /// Returns whether the file is gone afterwards. Failures are logged and
    /// never propagated.
    pub fn remove_file(&self) -> bool {
        match std::fs::remove_file(self.path()) {
            Ok(()) => {
                debug!(reference = %self.reference, "removed media file");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(reference = %self.reference, "could not remove media file: {e}");
                false
            }
        }
    }
}

/// Photo / video tally for a list of media items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaCounts {
    pub photos: usize,
    pub videos: usize,
}

impl MediaCounts {
    pub fn of(items: &[MediaItem]) -> Self {
        items.iter().fold(Self::default(), |mut counts, item| {
            match item.kind() {
                MediaKind::Photo => counts.photos += 1,
                MediaKind::Video => counts.videos += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.photos + self.videos
    }
}
