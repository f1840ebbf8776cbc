//! Supported platforms and their static profiles

pub mod detector;

pub use detector::{content_id, detect};

use crate::utils::error::SocialFetchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of supported content sources, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    TikTok,
    Instagram,
    Twitter,
    Snapchat,
}

/// Static description of a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    pub name: &'static str,
    pub display_name: &'static str,
    pub supported_content: &'static [&'static str],
    pub formats: &'static [&'static str],
    pub max_duration_secs: u32,
}

const PROFILES: [PlatformProfile; 4] = [
    PlatformProfile {
        name: "tiktok",
        display_name: "TikTok",
        supported_content: &["videos", "audio"],
        formats: &["mp4", "webm"],
        max_duration_secs: 600,
    },
    PlatformProfile {
        name: "instagram",
        display_name: "Instagram",
        supported_content: &["posts", "stories", "reels", "igtv"],
        formats: &["mp4", "jpg", "png"],
        max_duration_secs: 3600,
    },
    PlatformProfile {
        name: "twitter",
        display_name: "X (Twitter)",
        supported_content: &["tweets", "videos", "images"],
        formats: &["mp4", "jpg", "png"],
        max_duration_secs: 600,
    },
    PlatformProfile {
        name: "snapchat",
        display_name: "Snapchat",
        supported_content: &["stories", "snaps"],
        formats: &["mp4", "jpg"],
        max_duration_secs: 300,
    },
];

impl Platform {
    /// All platforms in detection order
    pub const ALL: [Platform; 4] = [
        Platform::TikTok,
        Platform::Instagram,
        Platform::Twitter,
        Platform::Snapchat,
    ];

    pub fn as_str(&self) -> &'static str {
        self.profile().name
    }

    pub fn profile(&self) -> &'static PlatformProfile {
        match self {
            Platform::TikTok => &PROFILES[0],
            Platform::Instagram => &PROFILES[1],
            Platform::Twitter => &PROFILES[2],
            Platform::Snapchat => &PROFILES[3],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = SocialFetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or(SocialFetchError::UnsupportedPlatform)
    }
}

/// Profiles of every supported platform, in detection order
pub fn catalog() -> &'static [PlatformProfile] {
    &PROFILES
}
