use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub start_ms: u64,
    pub text: String,
}

impl LyricLine {
    pub fn new(start_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            text: text.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("malformed lyrics document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid line timestamp: {0}")]
    InvalidTimestamp(String),
}

#[derive(Deserialize)]
struct LyricsDocument {
    lyrics: Option<LinesBlock>,
    #[serde(rename = "lyricsData")]
    lyrics_data: Option<LinesBlock>,
}

#[derive(Deserialize)]
struct LinesBlock {
    lines: Option<Vec<RawLine>>,
}

#[derive(Deserialize)]
struct RawLine {
    #[serde(rename = "startTimeMs")]
    start_time_ms: Millis,
    #[serde(default)]
    words: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Millis {
    Integer(u64),
    Float(f64),
    Text(String),
}

impl Millis {
    fn to_millis(&self) -> Result<u64, LyricsError> {
        let float = match self {
            Millis::Integer(ms) => return Ok(*ms),
            Millis::Float(ms) => *ms,
            Millis::Text(s) => {
                let s = s.trim();
                if let Ok(ms) = s.parse::<u64>() {
                    return Ok(ms);
                }
                s.parse::<f64>()
                    .map_err(|_| LyricsError::InvalidTimestamp(s.to_string()))?
            }
        };

        if float.is_finite() && float >= 0.0 {
            Ok(float as u64)
        } else {
            Err(LyricsError::InvalidTimestamp(float.to_string()))
        }
    }
}

/// Orders lines by start time, keeping the document order of equal timestamps.
pub fn sort_lines(mut lines: Vec<LyricLine>) -> Vec<LyricLine> {
    lines.sort_by_key(|l| l.start_ms);
    lines
}

/// Parses a synced-lyrics JSON document.
///
/// Lines are read from `lyrics.lines`, falling back to `lyricsData.lines`.
/// A document with neither yields no lines.
pub fn parse_lyrics_json(body: &str) -> Result<Vec<LyricLine>, LyricsError> {
    let doc: LyricsDocument = serde_json::from_str(body)?;
    let raw = doc
        .lyrics
        .and_then(|b| b.lines)
        .or_else(|| doc.lyrics_data.and_then(|b| b.lines))
        .unwrap_or_default();

    let lines = raw
        .into_iter()
        .map(|l| Ok(LyricLine::new(l.start_time_ms.to_millis()?, l.words)))
        .collect::<Result<Vec<_>, LyricsError>>()?;

    Ok(sort_lines(lines))
}

/// Parses LRC text. Lines carrying several timestamps are repeated for each.
pub fn parse_lrc(text: &str) -> Vec<LyricLine> {
    let mut entries = Vec::new();
    for raw_line in text.lines() {
        let mut rest = raw_line;
        let mut timestamps: Vec<u64> = Vec::new();

        while let Some(open) = rest.find('[') {
            let Some(close_rel) = rest[open..].find(']') else {
                break;
            };
            let close = open + close_rel;
            if let Some(ms) = parse_lrc_tag(&rest[open + 1..close]) {
                timestamps.push(ms);
            }
            rest = &rest[close + 1..];
        }

        let content = rest.trim();
        if content.is_empty() {
            continue;
        }
        for t in timestamps {
            entries.push(LyricLine::new(t, content));
        }
    }

    sort_lines(entries)
}

fn parse_lrc_tag(tag: &str) -> Option<u64> {
    let (min_s, sec_s) = tag.split_once(':')?;
    let min = min_s.parse::<u64>().ok()?;

    let (sec, frac_ms) = match sec_s.split_once('.') {
        Some((sec, frac)) => {
            let sec = sec.parse::<u64>().ok()?;
            let digits: String = frac.chars().take(3).collect();
            let value = digits.parse::<u64>().unwrap_or(0);
            let frac_ms = match digits.len() {
                1 => value * 100,
                2 => value * 10,
                _ => value,
            };
            (sec, frac_ms)
        }
        None => (sec_s.parse::<u64>().ok()?, 0),
    };

    Some((min * 60 + sec) * 1000 + frac_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lyrics_lines() {
        let lines = parse_lyrics_json(
            r#"{"lyrics":{"lines":[
                {"startTimeMs":"1000","words":"b"},
                {"startTimeMs":0,"words":"a"},
                {"startTimeMs":"2000.0","words":"c"}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(
            lines,
            vec![
                LyricLine::new(0, "a"),
                LyricLine::new(1000, "b"),
                LyricLine::new(2000, "c"),
            ]
        );
    }

    #[test]
    fn falls_back_to_lyrics_data() {
        let lines =
            parse_lyrics_json(r#"{"lyricsData":{"lines":[{"startTimeMs":"5","words":"x"}]}}"#)
                .unwrap();
        assert_eq!(lines, vec![LyricLine::new(5, "x")]);
    }

    #[test]
    fn empty_lyrics_lines_win_over_lyrics_data() {
        let lines = parse_lyrics_json(
            r#"{"lyrics":{"lines":[]},"lyricsData":{"lines":[{"startTimeMs":"5","words":"x"}]}}"#,
        )
        .unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn missing_lines_is_empty() {
        assert!(parse_lyrics_json("{}").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_timestamps() {
        assert!(matches!(
            parse_lyrics_json(r#"{"lyrics":{"lines":[{"startTimeMs":"soon","words":"x"}]}}"#),
            Err(LyricsError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parse_lyrics_json(r#"{"lyrics":{"lines":[{"startTimeMs":-4,"words":"x"}]}}"#),
            Err(LyricsError::InvalidTimestamp(_))
        ));
        assert!(parse_lyrics_json("not json").is_err());
    }

    #[test]
    fn parses_lrc() {
        let lines = parse_lrc("[ar:Someone]\n[00:01.5]one\n[00:00.25][00:03]two\n\n[01:02.123]three");
        assert_eq!(
            lines,
            vec![
                LyricLine::new(250, "two"),
                LyricLine::new(1500, "one"),
                LyricLine::new(3000, "two"),
                LyricLine::new(62123, "three"),
            ]
        );
    }
}
