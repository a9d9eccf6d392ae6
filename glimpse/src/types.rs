use {
    crate::Error,
    derive_more::{Add, AddAssign, From, Into, Neg, Sub, SubAssign},
    serde::{Deserialize, Serialize},
    std::{
        cmp::{max, min},
        fmt,
    },
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Neg,
    Serialize,
    Deserialize,
)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub x: i32,
    pub y: i32,
}

impl Size {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in frame coordinates.
///
/// Serialized as `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Rect {
    top_left: Point,
    size: Size,
}

impl Rect {
    pub const fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::from_pos_size(Point::new(x, y), Size::new(w, h))
    }

    pub const fn from_pos_size(top_left: Point, size: Size) -> Self {
        Self { top_left, size }
    }

    /// `right` and `bottom` are not inclusive.
    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::from_xywh(left, top, right - left, bottom - top)
    }

    #[must_use]
    pub fn translate(&self, delta: Point) -> Self {
        Self {
            top_left: self.top_left + delta,
            size: self.size,
        }
    }

    /// Grows the rectangle by `dx` on the left and right sides and by `dy`
    /// on the top and bottom sides.
    #[must_use]
    pub fn expand(&self, dx: i32, dy: i32) -> Self {
        Self::from_ltrb(
            self.left() - dx,
            self.top() - dy,
            self.right() + dx,
            self.bottom() + dy,
        )
    }

    pub fn top_left(&self) -> Point {
        self.top_left
    }

    /// Not inclusive.
    pub fn bottom_right(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    pub fn left(&self) -> i32 {
        self.top_left.x
    }

    pub fn right(&self) -> i32 {
        self.top_left.x + self.size.x
    }

    pub fn top(&self) -> i32 {
        self.top_left.y
    }

    pub fn bottom(&self) -> i32 {
        self.top_left.y + self.size.y
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> i32 {
        self.size.x
    }

    pub fn height(&self) -> i32 {
        self.size.y
    }

    pub fn area(&self) -> i64 {
        i64::from(self.size.x.max(0)) * i64::from(self.size.y.max(0))
    }

    pub fn is_empty(&self) -> bool {
        self.size.x <= 0 || self.size.y <= 0
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.top_left.x + self.size.x / 2,
            self.top_left.y + self.size.y / 2,
        )
    }

    pub fn contains(&self, pos: Point) -> bool {
        self.left() <= pos.x && pos.x < self.right() && self.top() <= pos.y && pos.y < self.bottom()
    }

    pub fn intersect(&self, other: Self) -> Self {
        let left = max(self.left(), other.left());
        let top = max(self.top(), other.top());
        let right = min(self.right(), other.right());
        let bottom = min(self.bottom(), other.bottom());
        if right < left || bottom < top {
            return Rect::default();
        }
        Self::from_ltrb(left, top, right, bottom)
    }
}

impl From<[i32; 4]> for Rect {
    fn from([x, y, w, h]: [i32; 4]) -> Self {
        Self::from_xywh(x, y, w, h)
    }
}

impl From<Rect> for [i32; 4] {
    fn from(rect: Rect) -> Self {
        [rect.left(), rect.top(), rect.width(), rect.height()]
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.left(),
            self.top(),
            self.right(),
            self.bottom()
        )
    }
}

/// RGB triple, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(value: [u8; 3]) -> Self {
        Self(value)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(value: Rgb) -> Self {
        value.0
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(value: image::Rgb<u8>) -> Self {
        Self(value.0)
    }
}

impl From<Rgb> for image::Rgb<u8> {
    fn from(value: Rgb) -> Self {
        image::Rgb(value.0)
    }
}

/// Template similarity on the `[0, 1]` scale, higher is more similar.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Similarity(f32);

impl Similarity {
    pub fn new(value: f32) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&value) {
            return Err(Error::InvalidThreshold(format!(
                "template similarity must be within [0, 1], got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub(crate) const fn new_unchecked(value: f32) -> Self {
        Self(value)
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Similarity {
    type Error = Error;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Similarity> for f32 {
    fn from(value: Similarity) -> Self {
        value.0
    }
}

/// Distance between two colors on the `[0, 255]` scale, lower is more similar.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Serialize, Deserialize,
)]
pub struct ColorDistance(pub u8);

/// Similarity of two colors on the `[0, 255]` scale, 255 means identical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Serialize, Deserialize,
)]
pub struct ColorSimilarity(pub u8);

impl ColorSimilarity {
    pub const fn from_distance(distance: ColorDistance) -> Self {
        Self(255 - distance.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_expand_and_intersect() {
        let rect = Rect::from_xywh(10, 20, 30, 40);
        let expanded = rect.expand(3, 5);
        assert_eq!(expanded, Rect::from_ltrb(7, 15, 43, 65));

        let frame = Rect::from_xywh(0, 0, 40, 60);
        assert_eq!(expanded.intersect(frame), Rect::from_ltrb(7, 15, 40, 60));
        assert!(Rect::from_xywh(100, 100, 5, 5).intersect(frame).is_empty());
    }

    #[test]
    fn rect_serializes_as_xywh() {
        let rect: Rect = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(rect, Rect::from_xywh(1, 2, 3, 4));
        assert_eq!(serde_json::to_string(&rect).unwrap(), "[1,2,3,4]");
    }

    #[test]
    fn similarity_rejects_out_of_range() {
        assert!(Similarity::new(0.85).is_ok());
        assert!(Similarity::new(221.0).is_err());
        assert!(Similarity::new(-0.1).is_err());
        assert!(Similarity::new(f32::NAN).is_err());
        assert!(serde_json::from_str::<Similarity>("1.5").is_err());
    }

    #[test]
    fn color_scales_are_inverse() {
        assert_eq!(
            ColorSimilarity::from_distance(ColorDistance(34)),
            ColorSimilarity(221)
        );
    }
}
