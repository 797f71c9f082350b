use super::catalog::PrimaryColor;
use super::hsv::{parse_hex, Hsv};
use crate::pipeline::services::image::analysis::Rgb8;

/// Nearest catalog color under an HSV distance that weighs hue heavily, so
/// pastel, saturated and dark variants of one hue land on the same color.
#[derive(Debug, Clone)]
pub struct ColorMatcher {
    pub hue_weight: f64,
    pub saturation_weight: f64,
    pub value_weight: f64,
    /// Below this saturation on both sides, only brightness is compared.
    pub low_saturation_threshold: f64,
}

impl Default for ColorMatcher {
    fn default() -> Self {
        Self {
            hue_weight: 6.0,
            saturation_weight: 1.0,
            value_weight: 1.0,
            low_saturation_threshold: 0.2,
        }
    }
}

impl ColorMatcher {
    pub fn distance(&self, a: Rgb8, b: Rgb8) -> f64 {
        let a = Hsv::from_rgb(a);
        let b = Hsv::from_rgb(b);

        // hue carries no information for grays, whites and blacks
        if a.s < self.low_saturation_threshold && b.s < self.low_saturation_threshold {
            return (a.v - b.v).abs();
        }

        let h = a.hue_distance(&b) / 180.0;
        let s = (a.s - b.s).abs();
        let v = (a.v - b.v).abs();

        (self.hue_weight * h * h + self.saturation_weight * s * s + self.value_weight * v * v).sqrt()
    }

    /// Closest candidate with a usable hex code. `None` for malformed input or
    /// when no candidate qualifies; the first candidate wins ties.
    pub fn find_closest_primary_color<'a>(
        &self,
        hex: &str,
        candidates: &'a [PrimaryColor],
    ) -> Option<&'a PrimaryColor> {
        let target = parse_hex(hex)?;

        let mut closest: Option<(&PrimaryColor, f64)> = None;
        for candidate in candidates {
            let Some(rgb) = candidate.hex_code.as_deref().and_then(parse_hex) else {
                continue;
            };
            let distance = self.distance(target, rgb);
            if closest.map_or(true, |(_, best)| distance < best) {
                closest = Some((candidate, distance));
            }
        }

        closest.map(|(color, _)| color)
    }
}

/// [`ColorMatcher::find_closest_primary_color`] with the default weights.
pub fn find_closest_primary_color<'a>(
    hex: &str,
    candidates: &'a [PrimaryColor],
) -> Option<&'a PrimaryColor> {
    ColorMatcher::default().find_closest_primary_color(hex, candidates)
}
