use {
    crate::{
        matching::{crop, mean_color},
        types::{Rect, Rgb},
        Error, Frame,
    },
    image::RgbImage,
    std::{fmt, sync::Arc},
    strum::Display,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LandmarkKind {
    Template,
    Color,
}

/// A named region of the screen with a reference appearance.
///
/// Every landmark has a reference color. Template landmarks also carry an
/// image patch of exactly the size of `area`, and their color is the mean
/// color of that patch.
#[derive(Debug, Clone)]
pub struct Landmark {
    name: String,
    area: Rect,
    click_area: Rect,
    color: Rgb,
    template: Option<Arc<RgbImage>>,
}

impl Landmark {
    pub fn from_color(name: impl Into<String>, area: Rect, color: Rgb) -> Result<Self, Error> {
        let name = name.into();
        check_area(&name, area)?;
        Ok(Self {
            name,
            area,
            click_area: area,
            color,
            template: None,
        })
    }

    pub fn from_template(
        name: impl Into<String>,
        area: Rect,
        template: RgbImage,
    ) -> Result<Self, Error> {
        let name = name.into();
        check_area(&name, area)?;
        let expected = (area.width() as u32, area.height() as u32);
        if template.dimensions() != expected {
            return Err(Error::TemplateSize {
                name,
                expected,
                actual: template.dimensions(),
            });
        }
        Ok(Self {
            color: mean_color(&template),
            name,
            area,
            click_area: area,
            template: Some(Arc::new(template)),
        })
    }

    /// Creates a template landmark from the contents of `frame` at `area`.
    pub fn from_frame(name: impl Into<String>, area: Rect, frame: &Frame) -> Result<Self, Error> {
        Self::from_template(name, area, crop(frame, area))
    }

    pub fn with_click_area(mut self, click_area: Rect) -> Result<Self, Error> {
        check_area(&self.name, click_area)?;
        self.click_area = click_area;
        Ok(self)
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn click_area(&self) -> Rect {
        self.click_area
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn template(&self) -> Option<&RgbImage> {
        self.template.as_deref()
    }

    pub fn kind(&self) -> LandmarkKind {
        if self.template.is_some() {
            LandmarkKind::Template
        } else {
            LandmarkKind::Color
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn check_area(name: &str, area: Rect) -> Result<(), Error> {
    if area.is_empty() || area.left() < 0 || area.top() < 0 {
        return Err(Error::InvalidArea {
            name: name.into(),
            area,
        });
    }
    Ok(())
}

/// Either a landmark or a bare region of the frame.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Landmark(&'a Landmark),
    Region(Rect),
}

impl Target<'_> {
    /// The rectangle to crop from a frame.
    pub fn area(&self) -> Rect {
        match self {
            Target::Landmark(landmark) => landmark.area(),
            Target::Region(rect) => *rect,
        }
    }
}

impl<'a> From<&'a Landmark> for Target<'a> {
    fn from(value: &'a Landmark) -> Self {
        Target::Landmark(value)
    }
}

impl From<Rect> for Target<'_> {
    fn from(value: Rect) -> Self {
        Target::Region(value)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, image::Rgb as Pixel};

    #[test]
    fn rejects_empty_area() {
        let err = Landmark::from_color("empty", Rect::from_xywh(5, 5, 0, 10), Rgb::new(1, 2, 3))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArea { .. }), "{err}");
        assert!(Landmark::from_color("negative", Rect::from_xywh(-1, 0, 4, 4), Rgb::default())
            .is_err());
    }

    #[test]
    fn template_size_must_match_area() {
        let patch = RgbImage::from_pixel(4, 3, Pixel([9, 9, 9]));
        let err = Landmark::from_template("t", Rect::from_xywh(0, 0, 4, 4), patch).unwrap_err();
        assert!(
            matches!(
                err,
                Error::TemplateSize {
                    expected: (4, 4),
                    actual: (4, 3),
                    ..
                }
            ),
            "{err}"
        );
    }

    #[test]
    fn template_color_is_patch_mean() {
        let patch = RgbImage::from_pixel(2, 2, Pixel([10, 20, 30]));
        let landmark = Landmark::from_template("t", Rect::from_xywh(1, 1, 2, 2), patch).unwrap();
        assert_eq!(landmark.color(), Rgb::new(10, 20, 30));
        assert_eq!(landmark.kind(), LandmarkKind::Template);
        assert_eq!(landmark.click_area(), landmark.area());
    }

    #[test]
    fn target_area() {
        let landmark =
            Landmark::from_color("c", Rect::from_xywh(1, 2, 3, 4), Rgb::default()).unwrap();
        assert_eq!(Target::from(&landmark).area(), Rect::from_xywh(1, 2, 3, 4));
        assert_eq!(
            Target::from(Rect::from_xywh(0, 0, 9, 9)).area(),
            Rect::from_xywh(0, 0, 9, 9)
        );
    }
}
