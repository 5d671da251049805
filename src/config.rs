use std::time::Duration;

use color_eyre::eyre::{Result, eyre};

use crate::{
    lyrics::sync::LyricsMode,
    spectrum::{layout::Orientation, surface::DeviceScale},
    track::{color::ThemeColor, model::TrackRef},
};

const DEFAULT_PLAYLIST: &str = "\
spotify:track:4cOdK2wGLETKBW3PvgPWqT|spotify:image:ab67616d0000b273e319baafd16e84f0408af2a0,\
spotify:episode:512ojhOuo1ktJprKbVcKyQ,\
spotify:track:7GhIk7Il098yCjg4BQjzvb|spotify:image:ab67616d0000b2734ce8b4e42588bf18182a1ad2";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub orientation: Orientation,
    pub lyrics_mode: LyricsMode,
    pub frame_interval: Duration,
    pub tick_interval: Duration,
    pub scale: DeviceScale,
    pub background: ThemeColor,
    pub playlist: Vec<TrackRef>,
    pub track_length: Duration,
    pub timeout_secs: u64,
    pub bins: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: "https://spclient.wg.spotify.com".to_string(),
            token: None,
            orientation: Orientation::Horizontal,
            lyrics_mode: LyricsMode::Overlay,
            frame_interval: Duration::from_millis(33),
            tick_interval: Duration::from_millis(100),
            scale: DeviceScale::default(),
            background: ThemeColor::BLACK,
            playlist: parse_playlist(DEFAULT_PLAYLIST),
            track_length: Duration::from_secs(45),
            timeout_secs: 10,
            bins: 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies every `AURALIS_*` variable `lookup` knows over the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base) = get("AURALIS_API_BASE") {
            config.api_base = base;
        }
        config.token = get("AURALIS_TOKEN").or(config.token);
        if let Some(v) = get("AURALIS_ORIENTATION") {
            config.orientation = parse_orientation(&v)
                .ok_or_else(|| invalid("AURALIS_ORIENTATION", &v))?;
        }
        if let Some(v) = get("AURALIS_LYRICS_MODE") {
            config.lyrics_mode = parse_lyrics_mode(&v)
                .ok_or_else(|| invalid("AURALIS_LYRICS_MODE", &v))?;
        }
        if let Some(v) = get("AURALIS_FRAME_MS") {
            config.frame_interval = parse_millis(&v)
                .ok_or_else(|| invalid("AURALIS_FRAME_MS", &v))?;
        }
        if let Some(v) = get("AURALIS_TICK_MS") {
            config.tick_interval = parse_millis(&v)
                .ok_or_else(|| invalid("AURALIS_TICK_MS", &v))?;
        }
        if let Some(v) = get("AURALIS_SCALE") {
            config.scale = parse_scale(&v)
                .ok_or_else(|| invalid("AURALIS_SCALE", &v))?;
        }
        if let Some(v) = get("AURALIS_BACKGROUND") {
            config.background = ThemeColor::from_hex(&v)
                .ok_or_else(|| invalid("AURALIS_BACKGROUND", &v))?;
        }
        if let Some(v) = get("AURALIS_PLAYLIST") {
            config.playlist = parse_playlist(&v);
        }
        if let Some(v) = get("AURALIS_TRACK_SECS") {
            let secs = v.trim().parse::<u64>().ok().filter(|s| *s > 0);
            let secs = secs.ok_or_else(|| invalid("AURALIS_TRACK_SECS", &v))?;
            config.track_length = Duration::from_secs(secs);
        }
        if let Some(v) = get("AURALIS_TIMEOUT_SECS") {
            let secs = v.trim().parse::<u64>().ok().filter(|s| *s > 0);
            config.timeout_secs = secs.ok_or_else(|| invalid("AURALIS_TIMEOUT_SECS", &v))?;
        }

        Ok(config)
    }
}

fn invalid(key: &str, value: &str) -> color_eyre::Report {
    eyre!("invalid value for {}: {:?}", key, value)
}

fn parse_orientation(value: &str) -> Option<Orientation> {
    match value.trim().to_ascii_lowercase().as_str() {
        "horizontal" => Some(Orientation::Horizontal),
        "vertical" => Some(Orientation::Vertical),
        _ => None,
    }
}

fn parse_lyrics_mode(value: &str) -> Option<LyricsMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "overlay" => Some(LyricsMode::Overlay),
        "triplet" => Some(LyricsMode::Triplet),
        _ => None,
    }
}

fn parse_millis(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn parse_scale(value: &str) -> Option<DeviceScale> {
    let (x, y) = value.trim().split_once(['x', 'X'])?;
    let scale = DeviceScale {
        x: x.trim().parse().ok()?,
        y: y.trim().parse().ok()?,
    };
    (scale.x > 0 && scale.y > 0).then_some(scale)
}

/// Comma-separated `uri` or `uri|artwork` entries. Unparseable entries are skipped.
pub fn parse_playlist(value: &str) -> Vec<TrackRef> {
    value
        .split(',')
        .filter_map(|entry| {
            let (uri, artwork) = match entry.split_once('|') {
                Some((uri, artwork)) => (uri, Some(artwork.trim().to_string())),
                None => (entry, None),
            };
            TrackRef::from_uri(uri, artwork.filter(|a| !a.is_empty()))
        })
        .collect()
}
