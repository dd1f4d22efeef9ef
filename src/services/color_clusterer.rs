// src/services/color_clusterer.rs
//! Greedy RGB clustering of pixel samples into a small palette with a mood.

use crate::models::{ColorPalette, Mood};
use log::debug;

/// Samples closer than this (Euclidean, RGB units) join an existing cluster.
const CLUSTER_DISTANCE: f64 = 30.0;
const WHITE_LUMINANCE: f64 = 0.9;
const BLACK_LUMINANCE: f64 = 0.1;

const FALLBACK_COLORS: [&str; 4] = ["#F5F5F0", "#D6D2C4", "#8E8A80", "#4A4A48"];

#[derive(Debug, Clone, Copy)]
pub struct PaletteOptions {
    pub max_colors: usize,
    pub ignore_white: bool,
    pub ignore_black: bool,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        Self {
            max_colors: 5,
            ignore_white: true,
            ignore_black: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Cluster {
    sum: [f64; 3],
    count: usize,
    centroid: [f64; 3],
}

impl Cluster {
    fn new(sample: [u8; 3]) -> Self {
        let color = sample.map(f64::from);
        Self {
            sum: color,
            count: 1,
            centroid: color,
        }
    }

    fn add(&mut self, sample: [u8; 3]) {
        for (channel, value) in sample.iter().enumerate() {
            self.sum[channel] += f64::from(*value);
        }
        self.count += 1;
        let count = self.count as f64;
        self.centroid = self.sum.map(|s| s / count);
    }

    fn rgb(&self) -> [u8; 3] {
        self.centroid.map(|c| c.round().clamp(0.0, 255.0) as u8)
    }
}

fn linearize(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Relative luminance in linear sRGB space, 0..1.
pub fn relative_luminance(rgb: [u8; 3]) -> f64 {
    0.2126 * linearize(rgb[0]) + 0.7152 * linearize(rgb[1]) + 0.0722 * linearize(rgb[2])
}

fn saturation(rgb: [u8; 3]) -> f64 {
    let max = rgb.iter().copied().max().unwrap_or(0);
    let min = rgb.iter().copied().min().unwrap_or(0);
    if max == 0 {
        0.0
    } else {
        f64::from(max - min) / f64::from(max)
    }
}

fn distance(a: &[f64; 3], b: [u8; 3]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - f64::from(y)).powi(2))
        .sum::<f64>()
        .sqrt()
}

pub fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

pub fn from_hex(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn cluster_samples(samples: &[[u8; 3]], options: &PaletteOptions) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for &sample in samples {
        let luminance = relative_luminance(sample);
        if options.ignore_white && luminance > WHITE_LUMINANCE {
            continue;
        }
        if options.ignore_black && luminance < BLACK_LUMINANCE {
            continue;
        }

        let nearest = clusters
            .iter()
            .enumerate()
            .map(|(index, cluster)| (index, distance(&cluster.centroid, sample)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        match nearest {
            Some((index, d)) if d < CLUSTER_DISTANCE => clusters[index].add(sample),
            _ => clusters.push(Cluster::new(sample)),
        }
    }

    // Stable sort keeps first-seen order among equally sized clusters.
    clusters.sort_by(|a, b| b.count.cmp(&a.count));
    clusters.truncate(options.max_colors.max(1));
    clusters
}

pub fn classify_mood(colors: &[[u8; 3]]) -> Mood {
    if colors.is_empty() {
        return Mood::Focus;
    }
    let n = colors.len() as f64;
    let avg_saturation = colors.iter().map(|c| saturation(*c)).sum::<f64>() / n;
    let avg_luminance = colors.iter().map(|c| relative_luminance(*c)).sum::<f64>() / n;
    let warm = colors.iter().filter(|c| c[0] > c[2]).count();
    let cool = colors.len() - warm;

    if avg_saturation > 0.6 && avg_luminance > 0.5 {
        Mood::Energizing
    } else if avg_saturation > 0.4 && warm > cool {
        Mood::Creativity
    } else if avg_luminance < 0.3 || avg_saturation < 0.2 {
        Mood::Focus
    } else {
        Mood::Calm
    }
}

fn describe(mood: Mood, count: usize) -> String {
    let noun = if count == 1 { "color" } else { "colors" };
    match mood {
        Mood::Energizing => format!(
            "{} bright, saturated {} give the space an energizing, upbeat feel.",
            count, noun
        ),
        Mood::Creativity => format!(
            "{} warm, lively {} create an atmosphere that encourages creativity.",
            count, noun
        ),
        Mood::Focus => format!(
            "{} muted, understated {} keep distractions low and support focus.",
            count, noun
        ),
        Mood::Calm => format!(
            "{} soft, balanced {} give the workspace a calm, relaxed character.",
            count, noun
        ),
    }
}

pub fn fallback_palette() -> ColorPalette {
    ColorPalette {
        colors: FALLBACK_COLORS.iter().map(|c| c.to_string()).collect(),
        mood: Mood::Focus,
        description: "A neutral palette of soft whites and warm grays that supports focus."
            .to_string(),
    }
}

/// Builds a palette from raw RGB samples. Falls back to a fixed neutral
/// palette when no cluster survives filtering.
pub fn extract_palette(samples: &[[u8; 3]], options: &PaletteOptions) -> ColorPalette {
    let clusters = cluster_samples(samples, options);
    if clusters.is_empty() {
        debug!(
            "No color clusters survived filtering ({} samples), using fallback palette",
            samples.len()
        );
        return fallback_palette();
    }

    let colors: Vec<[u8; 3]> = clusters.iter().map(Cluster::rgb).collect();
    let mood = classify_mood(&colors);
    debug!(
        "Extracted {} colors from {} samples, mood {}",
        colors.len(),
        samples.len(),
        mood.as_str()
    );

    ColorPalette {
        colors: colors.iter().map(|c| to_hex(*c)).collect(),
        mood,
        description: describe(mood, colors.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat(color: [u8; 3], n: usize) -> Vec<[u8; 3]> {
        std::iter::repeat_n(color, n).collect()
    }

    #[test]
    fn pure_white_falls_back_when_white_is_ignored() {
        let palette = extract_palette(&repeat([255, 255, 255], 100), &PaletteOptions::default());
        assert_eq!(palette, fallback_palette());
        assert_eq!(palette.colors.len(), 4);
        assert_eq!(palette.mood, Mood::Focus);
    }

    #[test]
    fn white_is_kept_when_not_ignored() {
        let options = PaletteOptions {
            ignore_white: false,
            ..Default::default()
        };
        let palette = extract_palette(&repeat([255, 255, 255], 10), &options);
        assert_eq!(palette.colors, vec!["#FFFFFF"]);
    }

    #[test]
    fn near_colors_merge_and_sort_by_population() {
        let mut samples = repeat([200, 40, 40], 3);
        samples.extend(repeat([40, 90, 200], 5));
        samples.push([205, 45, 42]);
        samples.push([42, 92, 198]);

        let palette = extract_palette(&samples, &PaletteOptions::default());
        assert_eq!(palette.colors.len(), 2);
        // blue cluster has 6 members, red 4
        assert!(palette.colors[0].starts_with("#2"));
        assert!(palette.colors[1].starts_with("#C"));
    }

    #[test]
    fn palette_size_respects_max_colors() {
        let samples: Vec<[u8; 3]> = (0..20u8).map(|i| [i * 12 + 10, 128, 255 - i * 12]).collect();
        for max_colors in [0, 1, 3, 5, 50] {
            let options = PaletteOptions {
                max_colors,
                ignore_white: false,
                ignore_black: false,
            };
            let palette = extract_palette(&samples, &options);
            assert!(!palette.colors.is_empty());
            assert!(palette.colors.len() <= max_colors.max(1));
        }
    }

    #[test]
    fn extraction_is_deterministic() {
        let samples: Vec<[u8; 3]> = (0..255u8).map(|i| [i, i / 2, 255 - i]).collect();
        let options = PaletteOptions::default();
        assert_eq!(extract_palette(&samples, &options), extract_palette(&samples, &options));
    }

    #[test]
    fn moods_follow_decision_order() {
        assert_eq!(classify_mood(&[[255, 230, 0], [0, 255, 80]]), Mood::Energizing);
        assert_eq!(classify_mood(&[[200, 90, 40], [180, 60, 90]]), Mood::Creativity);
        assert_eq!(classify_mood(&[[40, 40, 48], [60, 58, 62]]), Mood::Focus);
        assert_eq!(classify_mood(&[[150, 190, 220], [170, 200, 230]]), Mood::Calm);
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(to_hex([255, 8, 171]), "#FF08AB");
        assert_eq!(from_hex("#ff08ab"), Some([255, 8, 171]));
        assert_eq!(from_hex("ff08ab"), Some([255, 8, 171]));
        assert_eq!(from_hex("#fff"), None);
    }

    #[test]
    fn luminance_extremes() {
        assert!((relative_luminance([255, 255, 255]) - 1.0).abs() < 1e-9);
        assert_eq!(relative_luminance([0, 0, 0]), 0.0);
    }
}
