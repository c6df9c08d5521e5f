//! Candidate extraction from the structured player state.

use super::{looks_like_logo, non_empty, MetadataCandidate};
use crate::types::{FieldSource, MetaItem, PlayerState, Video};

/// Build the highest-priority candidate from a player state.
///
/// Returns `None` when the state carries no metadata item.
pub fn extract(state: &PlayerState, logo_marker: &str) -> Option<MetadataCandidate> {
    let meta = state.meta_item.as_ref()?;
    let video = state
        .selected_video_id()
        .and_then(|id| meta.videos.iter().find(|v| v.id == id));

    let art_url = video
        .and_then(|v| non_empty(v.thumbnail.as_deref()))
        .or_else(|| non_empty(meta.background.as_deref()))
        .or_else(|| non_empty(meta.logo.as_deref()));

    let logo = non_empty(meta.logo.as_deref()).or_else(|| {
        art_url
            .as_deref()
            .filter(|url| looks_like_logo(url, logo_marker))
            .map(str::to_string)
    });

    Some(MetadataCandidate {
        source: FieldSource::Hook,
        title: episode_title(meta, video),
        artist: non_empty(meta.name.as_deref()),
        art_url,
        logo,
    })
}

/// Display title for the selected video.
///
/// - Episode with a title: `"{season}x{episode} {title}"`, unless the title
///   already carries the `"{season}x"` marker
/// - Episode without any title: `"{series} ({season}x{episode})"`
/// - Otherwise the episode's own title or the container's name
pub fn episode_title(meta: &MetaItem, video: Option<&Video>) -> Option<String> {
    let series = non_empty(meta.name.as_deref());
    let Some(video) = video else {
        return series;
    };

    let own_title = non_empty(video.title.as_deref()).or_else(|| non_empty(video.name.as_deref()));

    match (video.season, video.episode, own_title) {
        (Some(season), Some(episode), Some(title)) => {
            if title.contains(&format!("{season}x")) {
                Some(title)
            } else {
                Some(format!("{season}x{episode} {title}"))
            }
        }
        (Some(season), Some(episode), None) => match series {
            Some(series) => Some(format!("{series} ({season}x{episode})")),
            None => Some(format!("{season}x{episode}")),
        },
        (_, _, Some(title)) => Some(title),
        _ => series,
    }
}
