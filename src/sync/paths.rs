//! Where a playable item lives in the local library.

use crate::catalog::CatalogItem;
use crate::config::{PathMode, SyncSettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Section {
    Movies,
    TvShows,
    Music,
}

impl Section {
    fn as_str(&self) -> &'static str {
        match self {
            Section::Movies => "movies",
            Section::TvShows => "tvshows",
            Section::Music => "music",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FileLocation {
    /// Directory, always ending with a separator.
    pub dir: String,
    pub filename: String,
    /// Complete location handed to the player.
    pub play_url: String,
}

fn split_last_separator(file: &str) -> (&str, &str) {
    let sep = if file.contains('\\') { '\\' } else { '/' };
    match file.rfind(sep) {
        Some(i) => (&file[..=i], &file[i + 1..]),
        None => ("", file),
    }
}

fn addon_root(settings: &SyncSettings, section: Section) -> String {
    format!("plugin://{}.{}/", settings.addon_id, section.as_str())
}

/// File location of a movie, episode or track.
pub(crate) fn file_location(
    item: &CatalogItem,
    settings: &SyncSettings,
    section: Section,
    remote_type: &str,
) -> FileLocation {
    let file = item.file_path();
    if settings.path_mode == PathMode::Direct {
        if let Some(file) = file {
            let (dir, filename) = split_last_separator(file);
            if !dir.is_empty() {
                return FileLocation {
                    dir: dir.to_string(),
                    filename: filename.to_string(),
                    play_url: file.to_string(),
                };
            }
        }
    }
    let dir = addon_root(settings, section);
    let basename = file.map(|f| split_last_separator(f).1).unwrap_or("");
    let url = format!(
        "{}?plex_id={}&plex_type={}&mode=play&filename={}",
        dir,
        item.remote_id().unwrap_or(""),
        remote_type,
        basename
    );
    FileLocation {
        dir,
        filename: url.clone(),
        play_url: url,
    }
}

/// `(top_level, folder)` of a series. The folder is what episodes and the
/// show link to; the top level is its parent path.
pub(crate) fn show_folder(item: &CatalogItem, settings: &SyncSettings) -> (String, String) {
    if settings.path_mode == PathMode::Direct {
        if let Some(location) = item.location() {
            let sep = if location.contains('\\') { '\\' } else { '/' };
            let trimmed = location.trim_end_matches(sep);
            let (top, _) = split_last_separator(trimmed);
            if !top.is_empty() {
                return (top.to_string(), format!("{}{}", trimmed, sep));
            }
        }
    }
    let top = addon_root(settings, Section::TvShows);
    let folder = format!("{}{}/", top, item.remote_id().unwrap_or(""));
    (top, folder)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(path_mode: PathMode) -> SyncSettings {
        SyncSettings {
            path_mode,
            addon_id: "plugin.test".to_string(),
            ..Default::default()
        }
    }

    fn item(json: &str) -> CatalogItem {
        CatalogItem::from_json(json).unwrap()
    }

    #[test]
    fn direct_mode_splits_file() {
        let it = item(r#"{"ratingKey": "1", "Media": [{"Part": [{"file": "/media/movies/Heat.mkv"}]}]}"#);
        let loc = file_location(&it, &settings(PathMode::Direct), Section::Movies, "movie");
        assert_eq!(loc.dir, "/media/movies/");
        assert_eq!(loc.filename, "Heat.mkv");
        assert_eq!(loc.play_url, "/media/movies/Heat.mkv");

        let win = item(r#"{"ratingKey": "1", "Media": [{"Part": [{"file": "C:\\Movies\\Heat.mkv"}]}]}"#);
        let loc = file_location(&win, &settings(PathMode::Direct), Section::Movies, "movie");
        assert_eq!(loc.dir, "C:\\Movies\\");
        assert_eq!(loc.filename, "Heat.mkv");
    }

    #[test]
    fn addon_mode_builds_plugin_url() {
        let it = item(r#"{"ratingKey": "42", "Media": [{"Part": [{"file": "/tv/s01e01.mkv"}]}]}"#);
        let loc = file_location(&it, &settings(PathMode::Addon), Section::TvShows, "episode");
        assert_eq!(loc.dir, "plugin://plugin.test.tvshows/");
        assert_eq!(
            loc.play_url,
            "plugin://plugin.test.tvshows/?plex_id=42&plex_type=episode&mode=play&filename=s01e01.mkv"
        );
        assert_eq!(loc.filename, loc.play_url);
    }

    #[test]
    fn direct_mode_without_file_falls_back_to_addon() {
        let it = item(r#"{"ratingKey": "5"}"#);
        let loc = file_location(&it, &settings(PathMode::Direct), Section::Movies, "movie");
        assert!(loc.dir.starts_with("plugin://"));
    }

    #[test]
    fn show_folders() {
        let it = item(r#"{"ratingKey": "9", "Location": [{"path": "/media/tv/The Wire"}]}"#);
        assert_eq!(
            show_folder(&it, &settings(PathMode::Direct)),
            ("/media/tv/".to_string(), "/media/tv/The Wire/".to_string())
        );
        assert_eq!(
            show_folder(&it, &settings(PathMode::Addon)),
            (
                "plugin://plugin.test.tvshows/".to_string(),
                "plugin://plugin.test.tvshows/9/".to_string()
            )
        );
    }
}
