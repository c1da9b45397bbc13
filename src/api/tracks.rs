use serde::{Deserialize, Serialize};

use crate::common::TrackId;

/// A single queued audio item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    /// Opaque storage reference for the audio blob. Resolved to a
    /// public path by the FileStore.
    pub storage_ref: String,
    /// Track metadata. Read-only once attached, never recomputed.
    pub info: TrackInfo,
}

impl Track {
    pub fn new(storage_ref: impl Into<String>, info: TrackInfo) -> Self {
        Self {
            id: TrackId::generate(),
            storage_ref: storage_ref.into(),
            info,
        }
    }
}

/// Metadata for an audio track.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub title: String,
    /// Duration in seconds. Authoritative for auto-advance.
    pub duration_secs: u64,
    pub size_bytes: u64,
    pub thumbnail: Option<String>,
    pub source_url: Option<String>,
    pub uploader: Option<String>,
    pub published: Option<String>,
}

#[cfg(test)]
pub(crate) fn test_track(title: &str, duration_secs: u64) -> Track {
    Track::new(
        format!("{title}.mp3"),
        TrackInfo {
            title: title.to_string(),
            duration_secs,
            size_bytes: duration_secs * 16_384,
            thumbnail: None,
            source_url: None,
            uploader: None,
            published: None,
        },
    )
}
