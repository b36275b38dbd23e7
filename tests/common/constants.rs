//! Shared constants for end-to-end tests
//!
//! Remote ids and titles of the test catalog. When test data changes,
//! update only this file.

#![allow(dead_code)]

// ============================================================================
// Movies
// ============================================================================

pub const MOVIE_1_ID: &str = "100";
pub const MOVIE_2_ID: &str = "101";
pub const COLLECTION_ID: &str = "150";
pub const COLLECTION_NAME: &str = "Heist Classics";

// ============================================================================
// Series
// ============================================================================

pub const SHOW_ID: &str = "300";
pub const SHOW_TITLE: &str = "The Test Show";
pub const SEASON_1_ID: &str = "400";
pub const SEASON_2_ID: &str = "401";
pub const EPISODE_1_ID: &str = "500";
pub const EPISODE_2_ID: &str = "501";
pub const EPISODE_3_ID: &str = "502";

// ============================================================================
// Music
// ============================================================================

pub const ARTIST_ID: &str = "700";
pub const ARTIST_NAME: &str = "The Test Band";
pub const ALBUM_ID: &str = "800";
pub const ALBUM_TITLE: &str = "First Album";
pub const TRACK_1_ID: &str = "900";
pub const TRACK_2_ID: &str = "901";
pub const TRACK_3_ID: &str = "902";

// ============================================================================
// Timestamps
// ============================================================================

pub const UPDATED_1: &str = "1700000000";
pub const UPDATED_2: &str = "1700009999";
