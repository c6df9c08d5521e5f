//! Candidate extraction from platform media-session metadata.

use super::{looks_like_logo, non_empty, MediaMetadata, MediaSession, MetadataCandidate};
use crate::types::FieldSource;
use tracing::trace;

pub fn extract(session: &dyn MediaSession, logo_marker: &str) -> MetadataCandidate {
    match session.metadata() {
        Some(metadata) => from_metadata(&metadata, logo_marker),
        None => {
            trace!("No media session metadata");
            MetadataCandidate::empty(FieldSource::MediaSession)
        }
    }
}

pub fn from_metadata(metadata: &MediaMetadata, logo_marker: &str) -> MetadataCandidate {
    MetadataCandidate {
        source: FieldSource::MediaSession,
        title: non_empty(Some(metadata.title.as_str())),
        artist: non_empty(Some(metadata.artist.as_str())),
        art_url: metadata
            .artwork
            .first()
            .and_then(|art| non_empty(Some(art.src.as_str()))),
        logo: metadata
            .artwork
            .iter()
            .find(|art| looks_like_logo(&art.src, logo_marker))
            .and_then(|art| non_empty(Some(art.src.as_str()))),
    }
}
