//! Thin proxy over the YouTube Data API for the dashboard's tutorial panel.

mod client;
mod duration;
mod relative_time;

pub use client::{DEFAULT_BASE_URL, Video, YoutubeClient, YoutubeError};
pub use duration::format_duration;
pub use relative_time::{format_relative, format_relative_str};

/// Environment variable consulted when the config has no API key.
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";
