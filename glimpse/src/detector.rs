//! Deciding whether a landmark is present on a frame.

use {
    crate::{
        config::DetectionConfig,
        landmark::Landmark,
        matching::{color_distance, crop, match_template, mean_color},
        types::{ColorDistance, Point, Rect, Similarity},
        Frame,
    },
    image::RgbImage,
    tracing::warn,
};

/// Horizontal search expansion used with a plain vertical offset.
const HORIZONTAL_OFFSET: u32 = 3;
/// Offsets are capped here. Any larger window covers the whole frame anyway.
const MAX_OFFSET: u32 = 1 << 20;

/// How far around the landmark area a template may be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Offset {
    /// The configured `button_offset`, applied as [`Offset::Vertical`].
    #[default]
    Default,
    /// ±3 px horizontally and ±`n` px vertically.
    Vertical(u32),
    /// ±`x` px horizontally and ±`y` px vertically. `Window { x: 0, y: 0 }`
    /// only accepts the template at its exact position.
    Window { x: u32, y: u32 },
}

impl Offset {
    pub const EXACT: Offset = Offset::Window { x: 0, y: 0 };

    fn resolve(self, config: &DetectionConfig) -> (i32, i32) {
        let (x, y) = match self {
            Offset::Default => (HORIZONTAL_OFFSET, config.button_offset),
            Offset::Vertical(n) => (HORIZONTAL_OFFSET, n),
            Offset::Window { x, y } => (x, y),
        };
        (clamp_offset(x), clamp_offset(y))
    }
}

fn clamp_offset(value: u32) -> i32 {
    i32::try_from(value.min(MAX_OFFSET)).unwrap_or(i32::MAX)
}

/// Matching mode together with the threshold on that mode's own scale.
///
/// `None` thresholds fall back to [`DetectionConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Matching {
    /// Compare the mean color of the landmark area with the reference color.
    Color { threshold: Option<ColorDistance> },
    /// Search for the reference patch around the landmark area.
    Template {
        offset: Offset,
        threshold: Option<Similarity>,
    },
}

impl Default for Matching {
    fn default() -> Self {
        Matching::color()
    }
}

impl Matching {
    pub const fn color() -> Self {
        Matching::Color { threshold: None }
    }

    pub const fn color_within(threshold: ColorDistance) -> Self {
        Matching::Color {
            threshold: Some(threshold),
        }
    }

    pub const fn template() -> Self {
        Matching::Template {
            offset: Offset::Default,
            threshold: None,
        }
    }

    pub const fn template_at(offset: Offset) -> Self {
        Matching::Template {
            offset,
            threshold: None,
        }
    }

    #[must_use]
    pub const fn with_similarity(self, similarity: Similarity) -> Self {
        match self {
            Matching::Template { offset, .. } => Matching::Template {
                offset,
                threshold: Some(similarity),
            },
            Matching::Color { .. } => Matching::Template {
                offset: Offset::Default,
                threshold: Some(similarity),
            },
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Matching::Template { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Distance(ColorDistance),
    Similarity(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    pub appeared: bool,
    pub score: Score,
    /// Displacement of the found template relative to the landmark area.
    /// Always zero in color mode.
    pub offset: Point,
}

impl Appearance {
    fn absent(score: Score) -> Self {
        Self {
            appeared: false,
            score,
            offset: Point::default(),
        }
    }
}

/// Evaluates `landmark` on `frame`.
pub fn detect(
    landmark: &Landmark,
    frame: &Frame,
    matching: Matching,
    config: &DetectionConfig,
) -> Appearance {
    match matching {
        Matching::Color { threshold } => {
            let threshold = threshold.unwrap_or(config.color_similar_threshold);
            let distance = color_distance(mean_color(&crop(frame, landmark.area())), landmark.color());
            Appearance {
                appeared: distance <= threshold,
                score: Score::Distance(distance),
                offset: Point::default(),
            }
        }
        Matching::Template { offset, threshold } => {
            let Some(template) = landmark.template() else {
                warn!("template matching requested for color-only landmark {landmark}");
                return Appearance::absent(Score::Similarity(0.0));
            };
            let threshold = threshold.unwrap_or(config.button_match_similarity);
            find_template(
                frame,
                landmark.area(),
                template,
                offset.resolve(config),
                threshold,
                config.color_similar_threshold,
            )
        }
    }
}

/// Searches `template` in `frame` within `area` expanded by `offset`.
///
/// `flat_tolerance` decides single-color comparisons, see [`match_template`].
pub(crate) fn find_template(
    frame: &Frame,
    area: Rect,
    template: &RgbImage,
    (dx, dy): (i32, i32),
    threshold: Similarity,
    flat_tolerance: ColorDistance,
) -> Appearance {
    let bounds = Rect::from_xywh(0, 0, frame.width() as i32, frame.height() as i32);
    let window_rect = area.expand(dx, dy).intersect(bounds);
    let window = crop(frame, window_rect);
    match match_template(&window, template, flat_tolerance) {
        Some(found) => Appearance {
            appeared: found.similarity >= threshold.get(),
            score: Score::Similarity(found.similarity),
            offset: window_rect.top_left() + found.position - area.top_left(),
        },
        None => Appearance::absent(Score::Similarity(0.0)),
    }
}
