//! Display ("TV") model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "landscape" => Some(Orientation::Landscape),
            "portrait" => Some(Orientation::Portrait),
            _ => None,
        }
    }
}

/// Whether a screen renders its playlist or the live queue sidebar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Playlist,
    Queue,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Playlist => "playlist",
            DisplayMode::Queue => "queue",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "playlist" => Some(DisplayMode::Playlist),
            "queue" => Some(DisplayMode::Queue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// A physical screen's configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Display {
    pub id: String,
    pub name: String,
    pub location: String,
    pub resolution: Resolution,
    pub orientation: Orientation,
    pub display_mode: DisplayMode,
    pub assigned_playlist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_inches: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Request body for registering a display. New displays start in playlist mode.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDisplayRequest {
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub resolution: Resolution,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub size_inches: Option<f64>,
}

/// Request body for updating a display.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDisplayRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    #[serde(default)]
    pub orientation: Option<Orientation>,
    #[serde(default)]
    pub display_mode: Option<DisplayMode>,
    #[serde(default)]
    pub size_inches: Option<f64>,
}

/// Request body for assigning a playlist; `null` unassigns.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPlaylistRequest {
    pub playlist_id: Option<String>,
}
