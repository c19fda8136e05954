//! Photo quality checks.
//!
//! Three checks run on the grayscale image, each contributing a score:
//! resolution (either side under [`MIN_DIMENSION`] px scores 0.3), mean
//! brightness (under [`DARK_BRIGHTNESS`] scores 0.4, over
//! [`BRIGHT_BRIGHTNESS`] scores 0.6) and sharpness (variance of the 3x3
//! Laplacian under [`BLUR_VARIANCE`] scores 0.5). A passing check scores 1.
//! The overall score is the mean, and the photo is good when it exceeds
//! [`GOOD_SCORE`].

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

/// Smallest acceptable width and height.
pub const MIN_DIMENSION: u32 = 300;
/// Mean brightness below which a photo is too dark.
pub const DARK_BRIGHTNESS: f64 = 50.0;
/// Mean brightness above which a photo is too bright.
pub const BRIGHT_BRIGHTNESS: f64 = 200.0;
/// Laplacian variance below which a photo is blurry.
pub const BLUR_VARIANCE: f64 = 100.0;
/// Overall score a photo must exceed to count as good.
pub const GOOD_SCORE: f64 = 0.6;

/// A problem found by [`assess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    /// The bytes are not a decodable image.
    Unreadable,
    /// Width or height under [`MIN_DIMENSION`].
    LowResolution,
    /// Mean brightness under [`DARK_BRIGHTNESS`].
    TooDark,
    /// Mean brightness over [`BRIGHT_BRIGHTNESS`].
    TooBright,
    /// Laplacian variance under [`BLUR_VARIANCE`].
    Blurry,
}

/// Outcome of the quality checks for one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageQuality {
    /// Whether [`Self::score`] exceeds [`GOOD_SCORE`].
    pub is_good: bool,
    /// Mean of the per-check scores, in `[0, 1]`.
    pub score: f64,
    /// Failed checks, in check order.
    pub issues: Vec<QualityIssue>,
}

impl ImageQuality {
    fn unreadable() -> Self {
        Self {
            is_good: false,
            score: 0.0,
            issues: vec![QualityIssue::Unreadable],
        }
    }
}

/// Decodes `bytes` and runs the quality checks. Undecodable input scores 0
/// with [`QualityIssue::Unreadable`].
#[must_use]
pub fn analyze_image_quality(bytes: &[u8]) -> ImageQuality {
    match image::load_from_memory(bytes) {
        Ok(image) => assess(&image),
        Err(e) => {
            log::debug!("Could not decode image for quality checks: {e}");
            ImageQuality::unreadable()
        }
    }
}

/// Runs the quality checks on a decoded image.
#[must_use]
pub fn assess(image: &DynamicImage) -> ImageQuality {
    let gray = image.to_luma8();
    let mut issues = Vec::new();
    let mut scores = [1.0_f64; 3];

    if gray.width() < MIN_DIMENSION || gray.height() < MIN_DIMENSION {
        issues.push(QualityIssue::LowResolution);
        scores[0] = 0.3;
    }

    let brightness = mean_brightness(&gray);
    if brightness < DARK_BRIGHTNESS {
        issues.push(QualityIssue::TooDark);
        scores[1] = 0.4;
    } else if brightness > BRIGHT_BRIGHTNESS {
        issues.push(QualityIssue::TooBright);
        scores[1] = 0.6;
    }

    if laplacian_variance(&gray) < BLUR_VARIANCE {
        issues.push(QualityIssue::Blurry);
        scores[2] = 0.5;
    }

    let score = scores.iter().sum::<f64>() / 3.0;

    ImageQuality {
        is_good: score > GOOD_SCORE,
        score,
        issues,
    }
}

/// Mean pixel value of a grayscale image, 0 for an empty one.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_brightness(gray: &GrayImage) -> f64 {
    let count = gray.pixels().len();
    if count == 0 {
        return 0.0;
    }
    gray.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / count as f64
}

/// Mirrors `i` into `0..n` without repeating the edge pixel.
fn reflect(i: i64, n: i64) -> i64 {
    if n == 1 {
        0
    } else if i < 0 {
        -i
    } else if i >= n {
        2 * n - 2 - i
    } else {
        i
    }
}

/// Population variance of the 4-neighbour Laplacian, with mirrored
/// borders. A flat image has variance 0.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = (i64::from(gray.width()), i64::from(gray.height()));
    if w == 0 || h == 0 {
        return 0.0;
    }

    let at = |x: i64, y: i64| {
        f64::from(gray.get_pixel(reflect(x, w) as u32, reflect(y, h) as u32).0[0])
    };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w {
            let v = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            sum += v;
            sum_sq += v * v;
        }
    }

    let n = (w * h) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}
