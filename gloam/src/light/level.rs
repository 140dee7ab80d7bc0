use super::LightSource;
use crate::math::Vec2;

/// Highest light tier, reached only at full intensity.
pub const MAX_TIER: u8 = 20;

/// Grayscale tint for each light tier. Tier 0 stays faintly visible.
pub const TIER_COLORS: [[f32; 3]; MAX_TIER as usize + 1] = [
    [0.08, 0.08, 0.08],
    [0.10, 0.10, 0.10],
    [0.15, 0.15, 0.15],
    [0.20, 0.20, 0.20],
    [0.25, 0.25, 0.25],
    [0.30, 0.30, 0.30],
    [0.35, 0.35, 0.35],
    [0.40, 0.40, 0.40],
    [0.45, 0.45, 0.45],
    [0.50, 0.50, 0.50],
    [0.55, 0.55, 0.55],
    [0.60, 0.60, 0.60],
    [0.65, 0.65, 0.65],
    [0.70, 0.70, 0.70],
    [0.75, 0.75, 0.75],
    [0.80, 0.80, 0.80],
    [0.85, 0.85, 0.85],
    [0.90, 0.90, 0.90],
    [0.95, 0.95, 0.95],
    [0.99, 0.99, 0.99],
    [1.00, 1.00, 1.00],
];

/// Normalized light intensity over a set of sample points.
///
/// Every light's linear falloff is summed per point, the sums are averaged
/// over the points and the result is clamped to `[0, 1]`. Sampling only the
/// corners of a quad is an approximation of the lit area, not an integral.
pub fn light_level(lights: &[LightSource], points: &[Vec2]) -> f32 {
    if points.is_empty() {
        return 0.0;
    }

    let total: f32 = points
        .iter()
        .map(|&point| {
            lights
                .iter()
                .map(|light| light.contribution(point))
                .sum::<f32>()
        })
        .sum();

    (total / points.len() as f32).clamp(0.0, 1.0)
}

/// Quantize an intensity into one of the discrete tiers `0..=MAX_TIER`.
///
/// Full intensity is the only way to reach `MAX_TIER`; everything in
/// `(0, 1)` rounds onto `0..=19`.
pub fn light_tier(intensity: f32) -> u8 {
    if intensity >= 1.0 {
        MAX_TIER
    } else if intensity > 0.0 {
        (intensity * 19.0).round() as u8
    } else {
        0
    }
}

/// Opaque RGBA tint for a tier. Tiers above `MAX_TIER` saturate.
pub fn tier_tint(tier: u8) -> [f32; 4] {
    let [r, g, b] = TIER_COLORS[usize::from(tier.min(MAX_TIER))];
    [r, g, b, 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn coincident_light_is_full_intensity() {
        let lights = [LightSource::new(3.0, 4.0, 6.0)];
        let level = light_level(&lights, &[Vec2::new(3.0, 4.0)]);
        assert_relative_eq!(level, 1.0);
        assert_eq!(light_tier(level), MAX_TIER);
    }

    #[test]
    fn light_at_its_range_is_dark() {
        let lights = [LightSource::new(0.0, 0.0, 6.0)];
        let level = light_level(&lights, &[Vec2::new(6.0, 0.0)]);
        assert_relative_eq!(level, 0.0);
        assert_eq!(light_tier(level), 0);
    }

    #[test]
    fn half_range_is_half_intensity() {
        let lights = [LightSource::new(0.0, 0.0, 6.0)];
        let level = light_level(&lights, &[Vec2::new(0.0, 3.0)]);
        assert_relative_eq!(level, 0.5);
        assert_eq!(light_tier(level), 10);
    }

    #[test]
    fn corners_are_averaged() {
        let lights = [LightSource::new(0.0, 0.0, 4.0)];
        // One corner fully lit, three out of range.
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert_relative_eq!(light_level(&lights, &points), 0.25);
    }

    #[test]
    fn overlapping_lights_clamp_to_one() {
        let lights = [
            LightSource::new(0.0, 0.0, 4.0),
            LightSource::new(0.0, 0.0, 4.0),
            LightSource::new(1.0, 0.0, 4.0),
        ];
        assert_relative_eq!(light_level(&lights, &[Vec2::new(0.5, 0.0)]), 1.0);
    }

    #[test]
    fn no_lights_or_no_points_is_dark() {
        assert_eq!(light_level(&[], &[Vec2::ZERO]), 0.0);
        assert_eq!(light_level(&[LightSource::new(0.0, 0.0, 1.0)], &[]), 0.0);
    }

    #[test]
    fn tiers_are_monotonic() {
        let mut previous = 0;
        for step in 0..=20 {
            let tier = light_tier(step as f32 * 0.05);
            assert!(tier >= previous, "tier dropped at step {step}");
            previous = tier;
        }
        assert_eq!(previous, MAX_TIER);
    }

    #[test]
    fn nan_intensity_is_tier_zero() {
        assert_eq!(light_tier(f32::NAN), 0);
    }

    #[test]
    fn tints_span_dark_to_white() {
        assert_eq!(tier_tint(0), [0.08, 0.08, 0.08, 1.0]);
        assert_eq!(tier_tint(MAX_TIER), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(tier_tint(200), tier_tint(MAX_TIER));
        for pair in TIER_COLORS.windows(2) {
            assert!(pair[0][0] < pair[1][0]);
        }
    }
}
