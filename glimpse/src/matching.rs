//! Pixel comparison primitives used by landmark detection.

use {
    crate::types::{ColorDistance, ColorSimilarity, Point, Rect, Rgb},
    image::{imageops, GrayImage, Luma, RgbImage},
    rayon::prelude::*,
    std::cmp::Ordering,
};

/// Variance below which an image is treated as a single flat color.
const FLAT_VARIANCE: f64 = 1e-6;

/// Best placement of a template inside a search window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
    /// Normalized correlation coefficient, clamped to `[0, 1]`.
    pub similarity: f32,
    /// Top-left corner of the placement relative to the search window.
    pub position: Point,
}

/// Extracts `rect` from `image`. Parts of `rect` outside the image are dropped.
pub fn crop(image: &RgbImage, rect: Rect) -> RgbImage {
    let bounds = Rect::from_xywh(0, 0, image.width() as i32, image.height() as i32);
    let rect = rect.intersect(bounds);
    if rect.is_empty() {
        return RgbImage::new(0, 0);
    }
    imageops::crop_imm(
        image,
        rect.left() as u32,
        rect.top() as u32,
        rect.width() as u32,
        rect.height() as u32,
    )
    .to_image()
}

/// Average color of all pixels, black for an empty image.
pub fn mean_color(image: &RgbImage) -> Rgb {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return Rgb::default();
    }
    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        for (sum, value) in sums.iter_mut().zip(pixel.0) {
            *sum += u64::from(value);
        }
    }
    Rgb(sums.map(|sum| ((sum + count / 2) / count) as u8))
}

/// Sum of the largest channel excess and the largest channel deficit of `a`
/// relative to `b`, saturated at 255.
pub fn color_distance(a: Rgb, b: Rgb) -> ColorDistance {
    let mut positive = 0i32;
    let mut negative = 0i32;
    for (a, b) in a.0.into_iter().zip(b.0) {
        let diff = i32::from(a) - i32::from(b);
        positive = positive.max(diff);
        negative = negative.min(diff);
    }
    ColorDistance((positive - negative).min(255) as u8)
}

pub fn color_similar(a: Rgb, b: Rgb, threshold: ColorDistance) -> bool {
    color_distance(a, b) <= threshold
}

/// Per-pixel similarity of `image` to `color`, 255 meaning identical.
pub fn color_similarity_map(image: &RgbImage, color: Rgb) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let distance = color_distance(Rgb(image.get_pixel(x, y).0), color);
        Luma([ColorSimilarity::from_distance(distance).0])
    })
}

/// Number of pixels whose similarity to `color` is strictly above `threshold`.
pub fn count_similar_pixels(image: &RgbImage, color: Rgb, threshold: ColorSimilarity) -> usize {
    color_similarity_map(image, color)
        .pixels()
        .filter(|pixel| pixel.0[0] > threshold.0)
        .count()
}

struct PreparedTemplate {
    width: u32,
    height: u32,
    /// Channel values minus the channel mean, row-major, 3 values per pixel.
    deviations: Vec<f64>,
    norm: f64,
    mean: [f64; 3],
    flat_tolerance: ColorDistance,
}

impl PreparedTemplate {
    fn new(patch: &RgbImage, flat_tolerance: ColorDistance) -> Self {
        let count = f64::from(patch.width() * patch.height());
        let mut mean = [0.0; 3];
        for pixel in patch.pixels() {
            for (sum, value) in mean.iter_mut().zip(pixel.0) {
                *sum += f64::from(value);
            }
        }
        mean.iter_mut().for_each(|sum| *sum /= count);

        let deviations: Vec<f64> = patch
            .pixels()
            .flat_map(|pixel| (0..3).map(move |c| f64::from(pixel.0[c]) - mean[c]))
            .collect();
        let norm = deviations.iter().map(|d| d * d).sum();
        Self {
            width: patch.width(),
            height: patch.height(),
            deviations,
            norm,
            mean,
            flat_tolerance,
        }
    }

    fn score_at(&self, window: &RgbImage, left: u32, top: u32) -> f32 {
        let count = f64::from(self.width * self.height);
        let mut cross = 0.0;
        let mut sums = [0.0; 3];
        let mut squares = 0.0;
        let mut deviations = self.deviations.iter();
        for y in top..top + self.height {
            for x in left..left + self.width {
                let pixel = window.get_pixel(x, y);
                for (c, value) in pixel.0.into_iter().enumerate() {
                    let value = f64::from(value);
                    sums[c] += value;
                    squares += value * value;
                    cross += deviations.next().copied().unwrap_or_default() * value;
                }
            }
        }
        let window_norm = squares - sums.iter().map(|sum| sum * sum / count).sum::<f64>();

        let template_flat = self.norm < FLAT_VARIANCE * count;
        let window_flat = window_norm < FLAT_VARIANCE * count;
        match (template_flat, window_flat) {
            (true, true) => {
                let window_mean = sums.map(|sum| (sum / count).round() as u8);
                let template_mean = self.mean.map(|m| m.round() as u8);
                if color_distance(Rgb(window_mean), Rgb(template_mean)) <= self.flat_tolerance {
                    1.0
                } else {
                    0.0
                }
            }
            (false, false) => (cross / (self.norm * window_norm).sqrt()).clamp(0.0, 1.0) as f32,
            _ => 0.0,
        }
    }
}

/// Finds the placement of `patch` inside `window` with the highest normalized
/// correlation coefficient.
///
/// The coefficient is undefined for single-color images. A single-color patch
/// on a single-color placement scores 1 if the two colors are within
/// `flat_tolerance` of each other and 0 otherwise.
///
/// Returns `None` if the patch is empty or does not fit into the window.
pub fn match_template(
    window: &RgbImage,
    patch: &RgbImage,
    flat_tolerance: ColorDistance,
) -> Option<TemplateMatch> {
    if patch.width() == 0
        || patch.height() == 0
        || patch.width() > window.width()
        || patch.height() > window.height()
    {
        return None;
    }
    let template = PreparedTemplate::new(patch, flat_tolerance);
    let columns = window.width() - patch.width() + 1;
    let rows = window.height() - patch.height() + 1;

    (0..columns * rows)
        .into_par_iter()
        .map(|index| {
            let (left, top) = (index % columns, index / columns);
            TemplateMatch {
                similarity: template.score_at(window, left, top),
                position: Point::new(left as i32, top as i32),
            }
        })
        .max_by(|a, b| {
            a.similarity
                .partial_cmp(&b.similarity)
                .unwrap_or(Ordering::Equal)
                // Prefer the earliest placement among equal scores.
                .then_with(|| (b.position.y, b.position.x).cmp(&(a.position.y, a.position.x)))
        })
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        image::Rgb as Pixel,
        rand::{rngs::StdRng, Rng, SeedableRng},
    };

    fn noise(width: u32, height: u32, seed: u64) -> RgbImage {
        let mut rng = StdRng::seed_from_u64(seed);
        RgbImage::from_fn(width, height, |_, _| Pixel([rng.random(), rng.random(), rng.random()]))
    }

    #[test]
    fn distance_sums_excess_and_deficit() {
        let a = Rgb::new(100, 50, 200);
        assert_eq!(color_distance(a, a), ColorDistance(0));
        assert_eq!(color_distance(a, Rgb::new(90, 60, 200)), ColorDistance(20));
        assert_eq!(color_distance(a, Rgb::new(90, 40, 190)), ColorDistance(10));
        assert_eq!(
            color_distance(Rgb::new(255, 0, 0), Rgb::new(0, 255, 0)),
            ColorDistance(255)
        );
    }

    #[test]
    fn crop_clamps_to_image() {
        let image = noise(20, 10, 1);
        let cropped = crop(&image, Rect::from_xywh(15, 5, 10, 10));
        assert_eq!(cropped.dimensions(), (5, 5));
        assert_eq!(cropped.get_pixel(0, 0), image.get_pixel(15, 5));
        assert_eq!(crop(&image, Rect::from_xywh(30, 30, 5, 5)).dimensions(), (0, 0));
    }

    #[test]
    fn mean_color_rounds() {
        let mut image = RgbImage::from_pixel(2, 1, Pixel([10, 20, 30]));
        image.put_pixel(1, 0, Pixel([11, 20, 31]));
        assert_eq!(mean_color(&image), Rgb::new(11, 20, 31));
    }

    #[test]
    fn template_found_at_its_position() {
        let window = noise(40, 30, 7);
        let patch = crop(&window, Rect::from_xywh(12, 9, 8, 6));
        let found = match_template(&window, &patch, ColorDistance(0)).unwrap();
        assert_eq!(found.position, Point::new(12, 9));
        assert!(found.similarity > 0.999, "{found:?}");
    }

    #[test]
    fn template_larger_than_window() {
        assert_eq!(
            match_template(&noise(4, 4, 1), &noise(5, 4, 2), ColorDistance(0)),
            None
        );
    }

    #[test]
    fn flat_images_compare_by_color() {
        let window = RgbImage::from_pixel(6, 6, Pixel([40, 40, 40]));
        let same = RgbImage::from_pixel(3, 3, Pixel([40, 40, 40]));
        let close = RgbImage::from_pixel(3, 3, Pixel([44, 44, 44]));
        let other = RgbImage::from_pixel(3, 3, Pixel([240, 40, 40]));
        let score = |patch: &RgbImage, tolerance: u8| {
            match_template(&window, patch, ColorDistance(tolerance))
                .unwrap()
                .similarity
        };
        assert_eq!(score(&same, 0), 1.0);
        assert_eq!(score(&close, 0), 0.0);
        assert_eq!(score(&close, 10), 1.0);
        assert_eq!(score(&other, 10), 0.0);
    }

    #[test]
    fn pixel_count_is_strict() {
        let mut image = RgbImage::from_pixel(10, 10, Pixel([0, 0, 0]));
        for index in 0..50 {
            image.put_pixel(index % 10, index / 10, Pixel([200, 30, 30]));
        }
        let color = Rgb::new(200, 30, 30);
        assert_eq!(count_similar_pixels(&image, color, ColorSimilarity(221)), 50);
    }
}
