//! Playlist and slide models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlideKind {
    #[default]
    Image,
}

impl SlideKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideKind::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(SlideKind::Image),
            _ => None,
        }
    }
}

/// A renderable item. `order` is an explicit sort key, not a list position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: String,
    pub playlist_id: String,
    pub kind: SlideKind,
    pub url: String,
    /// Display duration in seconds
    pub duration: u32,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Always sorted by `order`
    pub slides: Vec<Slide>,
}

/// Request body for creating a playlist.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    pub name: String,
}

/// Request body for adding a slide. Without `order` the slide goes last.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlideRequest {
    pub url: String,
    pub duration: u32,
    #[serde(default)]
    pub kind: SlideKind,
    #[serde(default)]
    pub order: Option<i64>,
}

/// Request body for updating a slide.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSlideRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub order: Option<i64>,
}
