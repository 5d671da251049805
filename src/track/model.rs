use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Track,
    Episode,
    Local,
    Other,
}

impl TrackKind {
    fn from_segment(segment: &str) -> Self {
        match segment {
            "track" => TrackKind::Track,
            "episode" => TrackKind::Episode,
            "local" => TrackKind::Local,
            _ => TrackKind::Other,
        }
    }
}

/// Reference to the media item a player reports as current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    pub id: String,
    pub kind: TrackKind,
    pub artwork: Option<String>,
}

impl TrackRef {
    pub fn new(id: impl Into<String>, kind: TrackKind, artwork: Option<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            artwork,
        }
    }

    /// Parses `spotify:<kind>:<id>`. A bare id is treated as a music track.
    pub fn from_uri(uri: &str, artwork: Option<String>) -> Option<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return None;
        }

        let mut parts = uri.split(':');
        let first = parts.next()?;
        let (kind, id) = match (parts.next(), parts.next()) {
            (Some(kind), Some(_)) if first == "spotify" => {
                // local files carry artist:album:title:duration after the kind
                let id = uri.rsplit(':').next()?;
                (TrackKind::from_segment(kind), id)
            }
            (Some(id), None) if first == "spotify" => (TrackKind::Other, id),
            (None, None) => (TrackKind::Track, first),
            _ => (TrackKind::Other, uri.rsplit(':').next()?),
        };

        if id.is_empty() {
            return None;
        }

        Some(Self::new(id, kind, artwork))
    }

    pub fn is_music(&self) -> bool {
        self.kind == TrackKind::Track
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TrackKind::Track => "track",
            TrackKind::Episode => "episode",
            TrackKind::Local => "local",
            TrackKind::Other => "unknown",
        };
        write!(f, "{}:{}", kind, self.id)
    }
}
