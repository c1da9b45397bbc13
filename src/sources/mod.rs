use std::sync::Arc;

use async_trait::async_trait;

use crate::common::SessionError;
use crate::storage::FileStore;

/// Assumed bitrate when a source carries no duration metadata:
/// 128 kbit/s, i.e. 16384 bytes per second of audio.
const FALLBACK_BYTES_PER_SEC: u64 = 128 * 1024 / 8;

/// A track resolved by the acquisition collaborator: blob already stored,
/// metadata attached. Admission limits are checked by the caller before
/// the track enters any queue.
#[derive(Debug, Clone)]
pub struct ResolvedTrack {
    pub storage_ref: String,
    pub title: String,
    pub duration_secs: u64,
    pub size_bytes: u64,
    pub thumbnail: Option<String>,
    pub source_url: Option<String>,
    pub uploader: Option<String>,
    pub published: Option<String>,
}

/// Acquisition collaborator: turns a query into a stored, described
/// audio blob.
#[async_trait]
pub trait AudioAcquisition: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, SessionError>;
}

/// Downloads direct audio URLs into the file store. Duration is
/// estimated from the byte size at 128 kbit/s when the source does not
/// say otherwise.
pub struct HttpAcquisition {
    http: reqwest::Client,
    store: Arc<dyn FileStore>,
}

impl HttpAcquisition {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            store,
        }
    }
}

#[async_trait]
impl AudioAcquisition for HttpAcquisition {
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, SessionError> {
        let url: reqwest::Url = query
            .parse()
            .map_err(|_| SessionError::AcquisitionFailed(format!("not a valid url: {query}")))?;

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SessionError::AcquisitionFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| SessionError::AcquisitionFailed(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SessionError::AcquisitionFailed(e.to_string()))?;
        let size_bytes = bytes.len() as u64;

        let (title, ext) = name_from_url(&url);
        let storage_ref = self.store.store(bytes, &ext).await?;

        Ok(ResolvedTrack {
            storage_ref,
            title,
            duration_secs: size_bytes / FALLBACK_BYTES_PER_SEC,
            size_bytes,
            thumbnail: None,
            source_url: Some(query.to_string()),
            uploader: None,
            published: None,
        })
    }
}

/// Title and extension derived from the last path segment.
fn name_from_url(url: &reqwest::Url) -> (String, String) {
    let segment = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("track");
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 4 => {
            (stem.to_string(), ext.to_lowercase())
        }
        _ => (segment.to_string(), "mp3".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_url() {
        let url: reqwest::Url = "https://cdn.example.com/music/My%20Song.mp3?sig=x"
            .parse()
            .unwrap();
        let (title, ext) = name_from_url(&url);
        assert_eq!(title, "My%20Song");
        assert_eq!(ext, "mp3");

        let url: reqwest::Url = "https://cdn.example.com/".parse().unwrap();
        let (title, ext) = name_from_url(&url);
        assert_eq!(title, "track");
        assert_eq!(ext, "mp3");
    }

    #[test]
    fn test_duration_estimate_constant() {
        // 1 MiB at 128 kbit/s is 64 seconds
        assert_eq!((1024 * 1024) / FALLBACK_BYTES_PER_SEC, 64);
    }
}
