//! Deterministic net colors.
//!
//! Connection indices are spread around the hue circle by the golden angle
//! so neighbouring indices never end up with similar colors.

use std::sync::OnceLock;

use regex::Regex;

/// Golden angle in degrees.
pub const GOLDEN_ANGLE_DEG: f64 = 137.507_764_050_037_85;

const SATURATION: f64 = 0.85;
const LIGHTNESS: f64 = 0.40;

/// Maps connection indices to hex colors, rotated by a per-problem offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetColorAssigner {
    offset: usize,
}

impl NetColorAssigner {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Hue in degrees for a connection index.
    pub fn hue(&self, index: usize) -> f64 {
        ((index + self.offset) as f64 * GOLDEN_ANGLE_DEG).rem_euclid(360.0)
    }

    pub fn color(&self, index: usize) -> String {
        hsl_to_hex(self.hue(index), SATURATION, LIGHTNESS)
    }

    /// Color for a point label such as `P03_2`, or `None` when the label has
    /// no numeric suffix.
    pub fn color_for_label(&self, label: &str) -> Option<String> {
        connection_index_from_label(label).map(|index| self.color(index))
    }
}

/// Parse the trailing `_<digits>` suffix of a point label.
pub fn connection_index_from_label(label: &str) -> Option<usize> {
    static SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();
    let re = SUFFIX.get_or_init(|| Regex::new(r"_(\d+)$").ok()).as_ref()?;
    re.captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Convert HSL (hue in degrees, saturation and lightness in `[0, 1]`) to `#rrggbb`.
pub fn hsl_to_hex(hue: f64, saturation: f64, lightness: f64) -> String {
    let h = hue.rem_euclid(360.0) / 360.0;
    let (r, g, b) = if saturation == 0.0 {
        (lightness, lightness, lightness)
    } else {
        let q = if lightness < 0.5 {
            lightness * (1.0 + saturation)
        } else {
            lightness + saturation - lightness * saturation
        };
        let p = 2.0 * lightness - q;
        (
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    };
    format!(
        "#{:02x}{:02x}{:02x}",
        to_byte(r),
        to_byte(g),
        to_byte(b)
    )
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_byte(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hue_sequence_follows_golden_angle() {
        let assigner = NetColorAssigner::new(0);
        for i in 0..50 {
            let expected = (i as f64 * 137.50776).rem_euclid(360.0);
            assert!((assigner.hue(i) - expected).abs() < 0.01, "index {}", i);
        }
    }

    #[test]
    fn test_first_twenty_hues_are_distinct() {
        let assigner = NetColorAssigner::new(0);
        let hues: Vec<f64> = (0..20).map(|i| assigner.hue(i)).collect();
        for i in 0..hues.len() {
            for j in (i + 1)..hues.len() {
                let diff = (hues[i] - hues[j]).abs();
                let circular = diff.min(360.0 - diff);
                assert!(circular >= 1.0, "hues {} and {} collide", i, j);
            }
        }
    }

    #[test]
    fn test_offset_rotates_sequence() {
        let base = NetColorAssigner::new(0);
        let shifted = NetColorAssigner::new(3);
        assert_eq!(shifted.color(0), base.color(3));
        assert_eq!(shifted.color(2), base.color(5));
    }

    #[test]
    fn test_hsl_to_hex_known_values() {
        assert_eq!(hsl_to_hex(0.0, 1.0, 0.5), "#ff0000");
        assert_eq!(hsl_to_hex(120.0, 1.0, 0.5), "#00ff00");
        assert_eq!(hsl_to_hex(240.0, 1.0, 0.5), "#0000ff");
        assert_eq!(hsl_to_hex(0.0, 0.0, 0.4), "#666666");
        // index 0, offset 0: hue 0 at s=0.85, l=0.40
        assert_eq!(NetColorAssigner::new(0).color(0), "#bd0f0f");
    }

    #[test]
    fn test_label_suffix_parsing() {
        assert_eq!(connection_index_from_label("P03_2"), Some(2));
        assert_eq!(connection_index_from_label("port_a_17"), Some(17));
        assert_eq!(connection_index_from_label("via"), None);
        assert_eq!(connection_index_from_label("P03_"), None);
        assert_eq!(connection_index_from_label("P03_x1"), None);

        let assigner = NetColorAssigner::new(1);
        assert_eq!(assigner.color_for_label("P00_0"), Some(assigner.color(0)));
        assert!(assigner.color_for_label("board").is_none());
    }
}
