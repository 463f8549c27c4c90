//! Color palettes for orbiters, attractor guides and the background fade.
//!
//! Colors are computed in HSV (hue in degrees) and resolved to 8-bit RGB.
//!
//! ```ignore
//! let palette = Palette::from_name("ocean");
//! let [r, g, b] = palette.particle_color(17, 2.5, 0.65);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named color palette.
///
/// The two palettes differ in hue base and in how hue drifts over time.
/// Deserializing an unknown name yields the default palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Palette {
    /// Golden-angle hue spread across the full wheel (default).
    #[default]
    Neon,

    /// Cyan/teal band drifting within 40 degrees.
    Ocean,
}

impl Palette {
    /// Resolve a palette identifier, case-insensitively.
    ///
    /// Unknown identifiers fall back to the default palette.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("ocean") {
            Palette::Ocean
        } else {
            Palette::default()
        }
    }

    /// Canonical lowercase identifier.
    pub fn name(&self) -> &'static str {
        match self {
            Palette::Neon => "neon",
            Palette::Ocean => "ocean",
        }
    }

    /// HSV triple for particle `index` at time `t` (seconds).
    pub fn particle_hsv(&self, index: usize, t: f32) -> (f32, f32, f32) {
        let i = index as f32;
        match self {
            Palette::Ocean => {
                let hue = 180.0 + (i * 3.5 + 18.0 * (0.21 * t + i * 0.05).sin()) % 40.0;
                let sat = 0.65 + 0.20 * (0.13 * t + i * 0.09).sin();
                (hue, sat, 0.95)
            }
            Palette::Neon => {
                let mut hue = (i * 137.508 + 90.0 * (0.23 * t + i * 0.031).sin()) % 360.0;
                if hue < 0.0 {
                    hue += 360.0;
                }
                (hue, 0.85, 1.0)
            }
        }
    }

    /// Particle color with the global saturation multiplier applied.
    pub fn particle_color(&self, index: usize, t: f32, saturation_mul: f32) -> [u8; 3] {
        let (hue, sat, val) = self.particle_hsv(index, t);
        let sat = (sat * saturation_mul).clamp(0.0, 1.0);
        hsv_to_rgb(hue, sat, val)
    }

    /// Color of attractor guide `k`.
    pub fn attractor_color(&self, k: usize, t: f32) -> [u8; 3] {
        let base = match self {
            Palette::Ocean => 190.0,
            Palette::Neon => 0.0,
        };
        let hue = base + 20.0 * k as f32 + 10.0 * (0.37 * t + k as f32).sin();
        hsv_to_rgb(hue % 360.0, 0.40, 0.90)
    }

    /// Background tint used for the per-frame fade.
    pub fn background_tint(&self, t: f32) -> [u8; 3] {
        match self {
            Palette::Ocean => hsv_to_rgb(210.0 + 6.0 * (0.10 * t).sin(), 0.25, 0.16),
            Palette::Neon => hsv_to_rgb(200.0, 0.10, 0.14),
        }
    }
}

impl From<String> for Palette {
    fn from(name: String) -> Self {
        Palette::from_name(&name)
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert HSV (hue in degrees `0..360`, saturation and value `0..1`) to 8-bit RGB.
///
/// Channels are truncated, then clamped to `0..=255`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    [to_channel(r + m), to_channel(g + m), to_channel(b + m)]
}

#[inline]
fn to_channel(v: f32) -> u8 {
    ((v * 255.0) as i32).clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [255, 0, 0]);
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), [0, 255, 0]);
        assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), [0, 0, 255]);
    }

    #[test]
    fn test_hsv_grayscale() {
        assert_eq!(hsv_to_rgb(75.0, 0.0, 1.0), [255, 255, 255]);
        assert_eq!(hsv_to_rgb(310.0, 0.7, 0.0), [0, 0, 0]);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Palette::from_name("ocean"), Palette::Ocean);
        assert_eq!(Palette::from_name("OCEAN"), Palette::Ocean);
        assert_eq!(Palette::from_name("neon"), Palette::Neon);
        assert_eq!(Palette::from_name("sunset"), Palette::Neon);
        assert_eq!(Palette::from_name(""), Palette::Neon);
    }

    #[test]
    fn test_unknown_palette_matches_default_bitwise() {
        let fallback = Palette::from_name("not-a-palette");
        for &(index, t) in &[(0usize, 0.0f32), (17, 2.5), (999, 123.456)] {
            assert_eq!(
                fallback.particle_color(index, t, 0.65),
                Palette::default().particle_color(index, t, 0.65)
            );
        }
    }

    #[test]
    fn test_palettes_differ() {
        let neon = Palette::Neon.particle_color(3, 1.0, 1.0);
        let ocean = Palette::Ocean.particle_color(3, 1.0, 1.0);
        assert_ne!(neon, ocean);
    }

    #[test]
    fn test_hue_ranges() {
        for i in 0..500 {
            let t = i as f32 * 0.37;
            let (h, _, _) = Palette::Neon.particle_hsv(i, t);
            assert!((0.0..360.0).contains(&h));
            let (h, s, _) = Palette::Ocean.particle_hsv(i, t);
            assert!(h > 140.0 && h < 220.0);
            assert!((0.449..=0.851).contains(&s));
        }
    }

    #[test]
    fn test_zero_saturation_multiplier_is_gray() {
        let [r, g, b] = Palette::Neon.particle_color(5, 0.5, 0.0);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }
}
