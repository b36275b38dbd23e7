//! Derived values of a [`CatalogItem`]: parsed numbers with their fallback
//! sentinels, normalized ratings and studios, provider ids, people and
//! technical stream details.

use super::item::{CatalogItem, ItemKind, Tag};
use crate::identity::compute_checksum;
use crate::library::{AudioStream, StreamDetails, VideoStream};
use crate::reconcile::{Cast, Person};
use chrono::DateTime;
use lazy_static::lazy_static;
use regex::Regex;

pub const MISSING_TITLE: &str = "Missing Title Name";
pub const DEFAULT_DATE_ADDED: &str = "2000-01-01 10:00:00";
pub const UNKNOWN_LANGUAGE: &str = "unknown";
/// Season or episode number that the server did not report.
pub const MISSING_INDEX: i64 = -1;
/// Track numbers of discs after the first are offset by `disc << 16`.
const DISC_TRACK_SHIFT: i64 = 65536;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

lazy_static! {
    static ref IMDB_REGEX: Regex = Regex::new(r"/(tt\d+)").unwrap();
    static ref TVDB_REGEX: Regex = Regex::new(r"thetvdb://(.+?)\?").unwrap();
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Provider {
    Imdb,
    Tvdb,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_int(value: &Option<String>) -> Option<i64> {
    let s = non_empty(value)?;
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
}

fn parse_float(value: &Option<String>) -> Option<f64> {
    non_empty(value)?.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn tag_names(tags: &[Tag]) -> Vec<String> {
    tags.iter()
        .filter_map(|t| non_empty(&t.tag))
        .map(str::to_string)
        .collect()
}

/// Renders a unix timestamp as the local store's date string.
pub fn unix_to_local_date(timestamp: i64, offset_secs: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp.checked_add(offset_secs)?, 0)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
}

/// Maps well-known studio spellings to the names scrapers use.
pub fn normalize_studio(name: &str) -> String {
    match name.to_lowercase().as_str() {
        "abc (us)" => "ABC".to_string(),
        "fox (us)" => "FOX".to_string(),
        "mtv (us)" => "MTV".to_string(),
        "showcase (ca)" => "Showcase".to_string(),
        "wgn america" => "WGN".to_string(),
        _ => name.to_string(),
    }
}

/// Joins denormalized list columns the way the library renders them.
pub fn join_list(values: &[String]) -> String {
    values.join(" / ")
}

impl CatalogItem {
    pub fn remote_id(&self) -> Option<&str> {
        non_empty(&self.rating_key)
    }

    pub fn item_kind(&self) -> Option<ItemKind> {
        non_empty(&self.kind).and_then(ItemKind::parse)
    }

    pub fn checksum(&self) -> Option<String> {
        self.remote_id()
            .map(|id| compute_checksum(id, self.updated_at.as_deref()))
    }

    /// `(title, sort_title)`; the sort title falls back to the title.
    pub fn titles(&self) -> (String, String) {
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| MISSING_TITLE.to_string());
        let sort_title = self.title_sort.clone().unwrap_or_else(|| title.clone());
        (title, sort_title)
    }

    pub fn plot(&self) -> Option<String> {
        self.summary.clone()
    }

    pub fn year(&self) -> Option<i64> {
        parse_int(&self.year)
    }

    /// Audience rating, else critic rating, else `0.0`.
    pub fn audience_rating(&self) -> f64 {
        match non_empty(&self.audience_rating) {
            Some(_) => parse_float(&self.audience_rating),
            None => parse_float(&self.rating),
        }
        .unwrap_or(0.0)
    }

    pub fn user_rating(&self) -> i64 {
        parse_float(&self.user_rating).map_or(0, |f| f as i64)
    }

    /// Play count as reported, `None` when absent.
    pub fn play_count(&self) -> Option<i64> {
        parse_int(&self.view_count)
    }

    pub fn view_count(&self) -> i64 {
        self.play_count().unwrap_or(0)
    }

    /// `(resume, runtime)` in seconds; source values are scaled by
    /// `time_factor` and truncated, `0` when absent.
    pub fn resume_runtime(&self, time_factor: f64) -> (i64, i64) {
        let scale = |v: &Option<String>| (parse_float(v).unwrap_or(0.0) * time_factor) as i64;
        (scale(&self.view_offset), scale(&self.duration))
    }

    pub fn content_rating(&self) -> Option<String> {
        let rating = self.content_rating.as_deref()?;
        if rating == "NR" || rating == "UR" {
            return Some("Rated Not Rated".to_string());
        }
        match rating.strip_prefix("gb/") {
            Some(rest) => Some(format!("UK:{}", rest)),
            None => Some(rating.to_string()),
        }
    }

    pub fn premiere_date(&self) -> Option<String> {
        self.originally_available_at.clone()
    }

    /// Normalized studio as a one-element list, or empty.
    pub fn studios(&self) -> Vec<String> {
        non_empty(&self.studio)
            .map(|s| vec![normalize_studio(s)])
            .unwrap_or_default()
    }

    /// Raw studio, used as the record label of albums.
    pub fn label(&self) -> Option<String> {
        self.studio.clone()
    }

    pub fn genre_list(&self) -> Vec<String> {
        tag_names(&self.genres)
    }

    pub fn country_list(&self) -> Vec<String> {
        tag_names(&self.countries)
    }

    pub fn collection_list(&self) -> Vec<String> {
        tag_names(&self.collections)
    }

    pub fn mood_list(&self) -> Vec<String> {
        tag_names(&self.moods)
    }

    pub fn cast(&self) -> Cast {
        let named = |tags: &[Tag]| -> Vec<Person> {
            tag_names(tags).into_iter().map(Person::named).collect()
        };
        Cast {
            actors: self
                .roles
                .iter()
                .filter_map(|r| {
                    non_empty(&r.tag).map(|name| Person {
                        name: name.to_string(),
                        character: r.role.clone(),
                        thumb: r.thumb.clone(),
                    })
                })
                .collect(),
            directors: named(&self.directors),
            writers: named(&self.writers),
        }
    }

    pub fn provider(&self, provider: Provider) -> Option<String> {
        let guid = self.guid.as_deref()?;
        let regex: &Regex = match provider {
            Provider::Imdb => &*IMDB_REGEX,
            Provider::Tvdb => &*TVDB_REGEX,
        };
        regex
            .captures(guid)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn date_added(&self, offset_secs: i64) -> String {
        parse_int(&self.added_at)
            .and_then(|ts| unix_to_local_date(ts, offset_secs))
            .unwrap_or_else(|| DEFAULT_DATE_ADDED.to_string())
    }

    pub fn last_played(&self, offset_secs: i64) -> Option<String> {
        parse_int(&self.last_viewed_at).and_then(|ts| unix_to_local_date(ts, offset_secs))
    }

    pub fn parent_id(&self) -> Option<&str> {
        non_empty(&self.parent_rating_key)
    }

    pub fn grandparent_id(&self) -> Option<&str> {
        non_empty(&self.grandparent_rating_key)
    }

    pub fn parent_title(&self) -> Option<&str> {
        non_empty(&self.parent_title)
    }

    pub fn grandparent_title(&self) -> Option<&str> {
        non_empty(&self.grandparent_title)
    }

    pub fn original_title(&self) -> Option<&str> {
        non_empty(&self.original_title)
    }

    /// `index`: season number of seasons, episode number of episodes.
    pub fn index_or_missing(&self) -> i64 {
        parse_int(&self.index).unwrap_or(MISSING_INDEX)
    }

    /// `parentIndex`: season number of an episode.
    pub fn parent_index_or_missing(&self) -> i64 {
        parse_int(&self.parent_index).unwrap_or(MISSING_INDEX)
    }

    /// Disc 1 keeps the plain index; later discs are offset per disc.
    pub fn track_number(&self) -> Option<i64> {
        let index = parse_int(&self.index)?;
        let disc = parse_int(&self.parent_index).unwrap_or(1);
        Some(if disc == 1 {
            index
        } else {
            disc * DISC_TRACK_SHIFT + index
        })
    }

    /// File of the first part of the first media, as the server sees it.
    pub fn file_path(&self) -> Option<&str> {
        self.media
            .first()
            .and_then(|m| m.parts.first())
            .and_then(|p| non_empty(&p.file))
    }

    /// Folder of a series.
    pub fn location(&self) -> Option<&str> {
        self.locations.iter().filter_map(|l| non_empty(&l.path)).last()
    }

    /// `(type, url)` pairs. Episodes only carry a thumbnail.
    pub fn artwork(&self) -> Vec<(&'static str, Option<&str>)> {
        let mut art = vec![("thumb", non_empty(&self.thumb))];
        if self.item_kind() != Some(ItemKind::Episode) {
            art.push(("fanart", non_empty(&self.art)));
            art.push(("banner", non_empty(&self.banner)));
        }
        art
    }

    pub fn stream_details(&self, time_factor: f64) -> StreamDetails {
        let mut details = StreamDetails::default();
        let Some(media) = self.media.first() else {
            return details;
        };
        let runtime = self.resume_runtime(time_factor).1;
        for part in &media.parts {
            let container = part
                .container
                .as_deref()
                .or(media.container.as_deref())
                .unwrap_or("");
            for stream in &part.streams {
                let codec = stream.codec.as_deref().map(str::to_lowercase);
                let language = || {
                    stream
                        .language_code
                        .as_deref()
                        .unwrap_or(UNKNOWN_LANGUAGE)
                        .to_lowercase()
                };
                match parse_int(&stream.stream_type) {
                    Some(1) => details.video.push(VideoStream {
                        codec: codec.map(|c| video_codec(c, container)),
                        aspect: parse_float(&stream.aspect_ratio)
                            .or_else(|| parse_float(&media.aspect_ratio)),
                        width: parse_int(&stream.width),
                        height: parse_int(&stream.height),
                        duration: Some(runtime),
                    }),
                    Some(2) => details.audio.push(AudioStream {
                        codec: codec.map(|c| audio_codec(c, stream.profile.as_deref())),
                        channels: parse_int(&stream.channels),
                        language: language(),
                    }),
                    Some(3) => details.subtitles.push(language()),
                    _ => {}
                }
            }
        }
        details
    }
}

fn video_codec(codec: String, container: &str) -> String {
    if codec.contains("msmpeg4") {
        "divx".to_string()
    } else if codec.contains("h264") && matches!(container, "mp4" | "mov" | "m4v") {
        "avc1".to_string()
    } else {
        codec
    }
}

fn audio_codec(codec: String, profile: Option<&str>) -> String {
    let is_master_audio = profile.map_or(false, |p| p.to_lowercase().contains("ma"));
    if codec.contains("dca") && is_master_audio {
        "dtshd_ma".to_string()
    } else {
        codec
    }
}
