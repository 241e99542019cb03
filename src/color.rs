//! Color values for captions and borders: hex (#RGB, #RGBA, #RRGGBB,
//! #RRGGBBAA) and a small set of named colors.

use core::fmt;

/// 8-bit sRGB color with alpha.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(try_from = "alloc::string::String", into = "alloc::string::String")
)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels in RGBA order.
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Parse a hex or named color.
    ///
    /// Accepts:
    /// - `#RGB` / `RGB`: alpha = 0xFF
    /// - `#RGBA` / `RGBA`
    /// - `#RRGGBB` / `RRGGBB`: alpha = 0xFF
    /// - `#RRGGBBAA` / `RRGGBBAA`
    /// - named colors (case-insensitive), see [`NAMED`](Self::NAMED)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let hex = s.strip_prefix('#').unwrap_or(s);
        parse_hex(hex).or_else(|| lookup_named(s))
    }

    /// Named colors understood by [`parse`](Self::parse), sorted by name.
    pub const NAMED: &'static [(&'static str, Color)] = &[
        ("black", Self::BLACK),
        ("blue", Self::rgb(0, 0, 255)),
        ("darkgray", Self::rgb(169, 169, 169)),
        ("gold", Self::rgb(255, 215, 0)),
        ("gray", Self::rgb(128, 128, 128)),
        ("green", Self::rgb(0, 128, 0)),
        ("lightgray", Self::rgb(211, 211, 211)),
        ("navy", Self::rgb(0, 0, 128)),
        ("orange", Self::rgb(255, 165, 0)),
        ("red", Self::rgb(255, 0, 0)),
        ("silver", Self::rgb(192, 192, 192)),
        ("transparent", Self::TRANSPARENT),
        ("white", Self::WHITE),
        ("yellow", Self::rgb(255, 255, 0)),
    ];
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// A string that is neither a hex color nor a known color name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidColor;

impl fmt::Display for InvalidColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected #RGB, #RGBA, #RRGGBB, #RRGGBBAA or a color name")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidColor {}

#[cfg(feature = "alloc")]
impl TryFrom<alloc::string::String> for Color {
    type Error = InvalidColor;

    fn try_from(s: alloc::string::String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or(InvalidColor)
    }
}

#[cfg(feature = "alloc")]
impl From<Color> for alloc::string::String {
    fn from(c: Color) -> Self {
        alloc::format!("{c}")
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let b = hex.as_bytes();
    match b.len() {
        3 => Some(Color::rgb(nibble(b[0])?, nibble(b[1])?, nibble(b[2])?)),
        4 => Some(Color::rgba(
            nibble(b[0])?,
            nibble(b[1])?,
            nibble(b[2])?,
            nibble(b[3])?,
        )),
        6 => Some(Color::rgb(byte(b[0], b[1])?, byte(b[2], b[3])?, byte(b[4], b[5])?)),
        8 => Some(Color::rgba(
            byte(b[0], b[1])?,
            byte(b[2], b[3])?,
            byte(b[4], b[5])?,
            byte(b[6], b[7])?,
        )),
        _ => None,
    }
}

/// 'f' → 0xFF, 'a' → 0xAA.
fn nibble(ch: u8) -> Option<u8> {
    let n = hex_val(ch)?;
    Some(n << 4 | n)
}

fn byte(hi: u8, lo: u8) -> Option<u8> {
    Some(hex_val(hi)? << 4 | hex_val(lo)?)
}

fn hex_val(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

fn lookup_named(name: &str) -> Option<Color> {
    Color::NAMED
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, c)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_table_is_sorted() {
        for pair in Color::NAMED.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn hex_short_forms() {
        assert_eq!(Color::parse("#f00"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("0f08"), Some(Color::rgba(0, 255, 0, 0x88)));
    }

    #[test]
    fn hex_long_forms() {
        assert_eq!(Color::parse("#1a2B3c"), Some(Color::rgb(0x1a, 0x2b, 0x3c)));
        assert_eq!(
            Color::parse("000000ff"),
            Some(Color::BLACK),
        );
        assert_eq!(Color::parse("#00000000"), Some(Color::TRANSPARENT));
    }

    #[test]
    fn named_case_insensitive() {
        assert_eq!(Color::parse("Black"), Some(Color::BLACK));
        assert_eq!(Color::parse("  WHITE "), Some(Color::WHITE));
    }

    #[test]
    fn invalid_inputs() {
        assert_eq!(Color::parse(""), None);
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("chartreuse-ish"), None);
        assert_eq!(Color::parse("#ggg"), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for c in [Color::BLACK, Color::rgba(1, 2, 3, 4), Color::rgb(200, 100, 50)] {
            let s = format!("{c}");
            assert_eq!(Color::parse(&s), Some(c), "{s}");
        }
    }
}
