use ratatui::style::Color;
use thiserror::Error;
use tracing::debug;

pub const COLOR_RESULT_TYPE: &str = "type.googleapis.com/spotify.context_track_color.ColorResult";
pub const FALLBACK_HEX: &str = "535353";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ThemeColor {
    pub const NEUTRAL: ThemeColor = ThemeColor::from_u32(0x535353);
    pub const BLACK: ThemeColor = ThemeColor::from_u32(0x000000);

    pub const fn from_u32(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Self::from_u32)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for ThemeColor {
    fn default() -> Self {
        ThemeColor::NEUTRAL
    }
}

impl From<ThemeColor> for Color {
    fn from(c: ThemeColor) -> Self {
        Color::Rgb(c.r, c.g, c.b)
    }
}

/// Opaque extracted-color result as delivered by the metadata service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorPayload {
    pub type_url: String,
    pub value: Vec<u8>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorDecodeError {
    #[error("payload truncated at byte {0}")]
    Truncated(usize),

    #[error("varint overflow at byte {0}")]
    VarintOverflow(usize),

    #[error("unsupported wire type {wire_type} at byte {offset}")]
    WireType { wire_type: u8, offset: usize },
}

pub trait ColorPayloadDecoder: Send + Sync {
    /// Light-variant RGB of the payload, `None` if the payload carries none.
    fn light_rgb(&self, payload: &[u8]) -> Result<Option<u32>, ColorDecodeError>;
}

/// Reads `ColorResult.color_light.rgb` straight off the protobuf wire format.
///
/// ```text
/// message ColorResult { Color color_raw = 1; Color color_light = 2; Color color_dark = 3; }
/// message Color { int32 rgb = 1; bool is_fallback = 2; }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ColorResultDecoder;

const COLOR_LIGHT_FIELD: u64 = 2;
const RGB_FIELD: u64 = 1;

impl ColorPayloadDecoder for ColorResultDecoder {
    fn light_rgb(&self, payload: &[u8]) -> Result<Option<u32>, ColorDecodeError> {
        let mut light = None;
        for field in WireReader::new(payload) {
            if let (COLOR_LIGHT_FIELD, WireValue::Bytes(bytes)) = field? {
                light = Some(bytes);
            }
        }

        let Some(light) = light else {
            return Ok(None);
        };

        let mut rgb = None;
        for field in WireReader::new(light) {
            if let (RGB_FIELD, WireValue::Varint(value)) = field? {
                rgb = Some(value as u32);
            }
        }
        Ok(rgb)
    }
}

enum WireValue<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
    Fixed,
}

struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> WireReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            failed: false,
        }
    }

    fn varint(&mut self) -> Result<u64, ColorDecodeError> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *self
                .data
                .get(self.pos)
                .ok_or(ColorDecodeError::Truncated(self.pos))?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ColorDecodeError::VarintOverflow(self.pos))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ColorDecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ColorDecodeError::Truncated(self.pos))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn field(&mut self) -> Result<(u64, WireValue<'a>), ColorDecodeError> {
        let offset = self.pos;
        let key = self.varint()?;
        let value = match (key & 0x7) as u8 {
            0 => WireValue::Varint(self.varint()?),
            1 => {
                self.take(8)?;
                WireValue::Fixed
            }
            2 => {
                let len = self.varint()? as usize;
                WireValue::Bytes(self.take(len)?)
            }
            5 => {
                self.take(4)?;
                WireValue::Fixed
            }
            wire_type => return Err(ColorDecodeError::WireType { wire_type, offset }),
        };
        Ok((key >> 3, value))
    }
}

impl<'a> Iterator for WireReader<'a> {
    type Item = Result<(u64, WireValue<'a>), ColorDecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let field = self.field();
        self.failed = field.is_err();
        Some(field)
    }
}

/// Resolves the theme color of a fetched payload. Never fails.
pub fn extract_theme_color(
    payload: Option<&ColorPayload>,
    decoder: &dyn ColorPayloadDecoder,
) -> ThemeColor {
    let Some(payload) = payload else {
        return ThemeColor::default();
    };
    if payload.value.is_empty() || payload.type_url != COLOR_RESULT_TYPE {
        return ThemeColor::default();
    }

    let hex = match decoder.light_rgb(&payload.value) {
        Ok(Some(rgb)) => format!("{:06x}", rgb),
        Ok(None) => FALLBACK_HEX.to_string(),
        Err(err) => {
            debug!(error = %err, "color_payload_undecodable");
            return ThemeColor::default();
        }
    };

    ThemeColor::from_hex(&hex).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // color_raw { rgb: 1 }, color_light { rgb: 0xFF00FF }
    const MAGENTA_LIGHT: [u8; 11] = [
        0x0a, 0x02, 0x08, 0x01, 0x12, 0x05, 0x08, 0xff, 0x81, 0xfc, 0x07,
    ];

    fn payload(type_url: &str, value: &[u8]) -> ColorPayload {
        ColorPayload {
            type_url: type_url.to_string(),
            value: value.to_vec(),
        }
    }

    #[test]
    fn decodes_light_variant() {
        let color = extract_theme_color(
            Some(&payload(COLOR_RESULT_TYPE, &MAGENTA_LIGHT)),
            &ColorResultDecoder,
        );
        assert_eq!(color.to_hex(), "#ff00ff");
    }

    #[test]
    fn empty_or_mismatched_payload_is_gray() {
        let gray = ThemeColor::from_hex("#535353").unwrap();
        assert_eq!(extract_theme_color(None, &ColorResultDecoder), gray);
        assert_eq!(
            extract_theme_color(Some(&payload(COLOR_RESULT_TYPE, &[])), &ColorResultDecoder),
            gray
        );
        assert_eq!(
            extract_theme_color(
                Some(&payload("type.googleapis.com/other.Type", &MAGENTA_LIGHT)),
                &ColorResultDecoder
            ),
            gray
        );
    }

    #[test]
    fn missing_light_field_uses_fallback_hex() {
        // only color_raw present
        let color = extract_theme_color(
            Some(&payload(COLOR_RESULT_TYPE, &[0x0a, 0x02, 0x08, 0x01])),
            &ColorResultDecoder,
        );
        assert_eq!(color.to_hex(), "#535353");
    }

    #[test]
    fn small_values_are_zero_padded() {
        // color_light { rgb: 0x0000ff }
        let color = extract_theme_color(
            Some(&payload(COLOR_RESULT_TYPE, &[0x12, 0x03, 0x08, 0xff, 0x01])),
            &ColorResultDecoder,
        );
        assert_eq!(color.to_hex(), "#0000ff");
    }

    #[test]
    fn truncated_payload_falls_back() {
        assert_eq!(
            ColorResultDecoder.light_rgb(&[0x12, 0x05, 0x08]),
            Err(ColorDecodeError::Truncated(2))
        );
        let color = extract_theme_color(
            Some(&payload(COLOR_RESULT_TYPE, &[0x12, 0x05, 0x08])),
            &ColorResultDecoder,
        );
        assert_eq!(color, ThemeColor::NEUTRAL);
    }

    #[test]
    fn parses_hex() {
        assert_eq!(ThemeColor::from_hex("#7c3aed").unwrap().to_hex(), "#7c3aed");
        assert!(ThemeColor::from_hex("#12345").is_none());
        assert!(ThemeColor::from_hex("zzzzzz").is_none());
    }
}
