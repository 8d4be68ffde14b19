//! Deterministic color theme derived from a track identifier.
//!
//! The same id always folds to the same hue, so every view that asks for a
//! theme agrees without sharing state.

use std::fmt;

const HUE_BASE: u32 = 140;
const HUE_BAND: u32 = 40;

/// An HSL color with integer components (hue in degrees, s/l in percent).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hsl {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

/// A color as either a fixed hex value or a derived HSL value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Hex(u32),
    Hsl(Hsl),
}

/// Gradient endpoints plus an accent color for the now-playing view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    pub from: Color,
    pub to: Color,
    pub accent: Color,
}

impl Theme {
    /// Palette used when there is no track to derive from.
    pub const DEFAULT: Theme = Theme {
        from: Color::Hex(0x061914),
        to: Color::Hex(0x0a1210),
        accent: Color::Hex(0x268168),
    };
}

/// Derive the theme for `track_id`.
pub fn derive_theme(track_id: &str) -> Theme {
    if track_id.is_empty() {
        return Theme::DEFAULT;
    }

    let hash = fold_hash(track_id).unsigned_abs();
    let hue = HUE_BASE + (hash % u64::from(HUE_BAND)) as u32;
    let hue2 = HUE_BASE + ((hash + 20) % u64::from(HUE_BAND)) as u32;

    Theme {
        from: Color::Hsl(Hsl::new(hue as u16, 60, 10)),
        to: Color::Hsl(Hsl::new(hue as u16, 80, 5)),
        accent: Color::Hsl(Hsl::new(hue2 as u16, 70, 40)),
    }
}

/// Order-dependent string hash `h = c + (h << 5) - h`.
///
/// Only the shifted operand wraps to 32 bits; the running sum stays unwrapped.
fn fold_hash(input: &str) -> i64 {
    input.encode_utf16().fold(0i64, |hash, unit| {
        let shifted = i64::from((hash as i32).wrapping_shl(5));
        i64::from(unit) + shifted - hash
    })
}

impl Hsl {
    pub const fn new(hue: u16, saturation: u8, lightness: u8) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    /// Convert to 8-bit RGB.
    pub fn to_rgb(self) -> (u8, u8, u8) {
        let h = f64::from(self.hue % 360) / 360.0;
        let s = f64::from(self.saturation.min(100)) / 100.0;
        let l = f64::from(self.lightness.min(100)) / 100.0;

        if s == 0.0 {
            let v = (l * 255.0).round() as u8;
            return (v, v, v);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let channel = |t: f64| -> u8 {
            let t = t.rem_euclid(1.0);
            let v = if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            };
            (v * 255.0).round().clamp(0.0, 255.0) as u8
        };
        (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
    }
}

impl Color {
    pub fn to_rgb(self) -> (u8, u8, u8) {
        match self {
            Color::Hex(v) => ((v >> 16) as u8, (v >> 8) as u8, v as u8),
            Color::Hsl(hsl) => hsl.to_rgb(),
        }
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Hex(v) => write!(f, "#{v:06x}"),
            Color::Hsl(hsl) => fmt::Display::fmt(hsl, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hue_of(color: Color) -> u16 {
        match color {
            Color::Hsl(hsl) => hsl.hue,
            Color::Hex(_) => panic!("expected derived color"),
        }
    }

    #[test]
    fn derive_theme_is_deterministic() {
        let a = derive_theme("65f0c0ffee");
        let b = derive_theme("65f0c0ffee");
        assert_eq!(a, b);
    }

    #[test]
    fn hues_stay_in_band() {
        for id in ["a", "zz", "track-42", "ÜNICODE", "0123456789abcdef0123456789abcdef"] {
            let theme = derive_theme(id);
            for color in [theme.from, theme.to, theme.accent] {
                let hue = hue_of(color);
                assert!((140..180).contains(&hue), "{id}: hue {hue}");
            }
        }
    }

    #[test]
    fn hash_is_order_dependent() {
        assert_ne!(fold_hash("ab"), fold_hash("ba"));
    }

    #[test]
    fn single_char_hash_matches_code_unit() {
        // 0 + (0 << 5) - 0 + 'a'
        assert_eq!(fold_hash("a"), 97);
        let theme = derive_theme("a");
        assert_eq!(hue_of(theme.from), 140 + 97 % 40);
        assert_eq!(hue_of(theme.accent), 140 + 117 % 40);
    }

    #[test]
    fn long_ids_keep_the_unwrapped_sum() {
        let id = "6650a1b2c3d4e5f6a7b8c9d0";
        assert_eq!(fold_hash(id), 7_849_932_521);
        let theme = derive_theme(id);
        assert_eq!(hue_of(theme.from), 141);
        assert_eq!(hue_of(theme.to), 141);
        assert_eq!(hue_of(theme.accent), 161);
    }

    #[test]
    fn empty_id_uses_default_palette() {
        let theme = derive_theme("");
        assert_eq!(theme, Theme::DEFAULT);
        assert_eq!(theme.accent.to_string(), "#268168");
    }

    #[test]
    fn hsl_display_and_rgb() {
        let c = Hsl::new(150, 60, 10);
        assert_eq!(c.to_string(), "hsl(150, 60%, 10%)");
        assert_eq!(Hsl::new(0, 0, 100).to_rgb(), (255, 255, 255));
        assert_eq!(Hsl::new(0, 100, 50).to_rgb(), (255, 0, 0));
        assert_eq!(Color::Hex(0x268168).to_rgb(), (0x26, 0x81, 0x68));
    }
}
