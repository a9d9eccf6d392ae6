use {
    crate::{
        config::DetectionConfig,
        detector::{detect, Matching},
        device::Device,
        interval::IntervalRegistry,
        landmark::{Landmark, Target},
        matching::{count_similar_pixels, crop},
        types::{ColorSimilarity, Point, Rgb},
        Error,
    },
    image::RgbImage,
    std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    },
    tracing::{debug, info},
};

/// Screenshot tag used by callers that don't have a more specific one.
pub const DEFAULT_SCREENSHOT_TAG: &str = "items";
/// Default per-pixel similarity for [`Session::image_color_count`].
pub const DEFAULT_COUNT_SIMILARITY: ColorSimilarity = ColorSimilarity(221);
/// Default pixel count for [`Session::image_color_count`].
pub const DEFAULT_PIXEL_COUNT: usize = 50;

/// Cooperative cancellation flag checked once per wait loop iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// One automation session driving a single device.
///
/// Interval timers, remembered template offsets and the cancellation flag
/// belong to the session, so independent sessions never share state even if
/// they check the same landmarks.
pub struct Session<D> {
    pub(crate) device: D,
    pub(crate) config: DetectionConfig,
    intervals: IntervalRegistry,
    match_offsets: HashMap<String, Point>,
    pub(crate) cancel: CancelToken,
}

impl<D: Device> Session<D> {
    pub fn new(device: D, config: DetectionConfig) -> Self {
        Self {
            device,
            config,
            intervals: IntervalRegistry::new(),
            match_offsets: HashMap::new(),
            cancel: CancelToken::default(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Returns a handle that stops the wait loops of this session.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Checks whether `landmark` is present on the current frame.
    ///
    /// With an `interval`, a landmark that has appeared is not reported again
    /// until the interval has passed.
    pub fn appear(
        &mut self,
        landmark: &Landmark,
        matching: Matching,
        interval: Option<Duration>,
    ) -> bool {
        self.device.stuck_record_add(landmark);

        let now = self.device.now();
        if !self.intervals.gate(landmark.name(), interval, now) {
            return false;
        }

        let appearance = detect(landmark, self.device.frame(), matching, &self.config);
        debug!(
            "{landmark}: appeared={} score={:?}",
            appearance.appeared, appearance.score
        );
        if appearance.appeared {
            if matching.is_template() {
                self.match_offsets
                    .insert(landmark.name().to_owned(), appearance.offset);
            }
            if interval.is_some() {
                self.intervals.fired(landmark.name(), now);
            }
        }
        appearance.appeared
    }

    /// Checks `landmark` once and clicks it if it is present.
    ///
    /// With a `screenshot` tag, a fresh frame is captured and saved under that
    /// tag right before clicking. Returns whether the landmark appeared.
    pub fn appear_then_click(
        &mut self,
        landmark: &Landmark,
        matching: Matching,
        interval: Option<Duration>,
        screenshot: Option<&str>,
    ) -> Result<bool, Error> {
        let appeared = self.appear(landmark, matching, interval);
        if appeared {
            if let Some(tag) = screenshot {
                self.device
                    .sleep(self.config.wait_before_saving_screenshot());
                self.device.refresh().map_err(Error::Capture)?;
                self.device.save_screenshot(tag).map_err(Error::Action)?;
            }
            self.click(landmark)?;
        }
        Ok(appeared)
    }

    /// Clicks the click area of `landmark`, shifted by the offset at which its
    /// template was last found.
    pub fn click(&mut self, landmark: &Landmark) -> Result<(), Error> {
        let offset = self
            .match_offsets
            .get(landmark.name())
            .copied()
            .unwrap_or_default();
        let area = landmark.click_area().translate(offset);
        info!("click {landmark} at {area}");
        self.device
            .click(landmark.name(), area)
            .map_err(Error::Action)
    }

    pub fn image_crop<'a>(&self, target: impl Into<Target<'a>>) -> RgbImage {
        crop(self.device.frame(), target.into().area())
    }

    /// Returns `true` if more than `count` pixels of the target area have a
    /// similarity to `color` above `threshold`.
    pub fn image_color_count<'a>(
        &self,
        target: impl Into<Target<'a>>,
        color: Rgb,
        threshold: ColorSimilarity,
        count: usize,
    ) -> bool {
        count_similar_pixels(&self.image_crop(target), color, threshold) > count
    }

    /// Lets the next interval-gated check of `landmark` pass immediately.
    pub fn interval_reset(&mut self, landmark: &Landmark) {
        self.intervals.reset(landmark.name());
    }

    pub fn interval_clear(&mut self, landmark: &Landmark) {
        self.intervals.clear(landmark.name());
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{device::FrameSource, replay::Replay, types::Rect, Offset},
        image::Rgb as Pixel,
        rand::{rngs::StdRng, Rng, SeedableRng},
    };

    fn red_square_frame() -> RgbImage {
        let mut frame = RgbImage::from_pixel(20, 20, Pixel([0, 0, 0]));
        for y in 5..15 {
            for x in 5..15 {
                frame.put_pixel(x, y, Pixel([220, 20, 20]));
            }
        }
        frame
    }

    fn red_button() -> Landmark {
        Landmark::from_color("red", Rect::from_xywh(5, 5, 10, 10), Rgb::new(220, 20, 20)).unwrap()
    }

    #[test]
    fn interval_suppresses_repeated_detection() {
        let mut session = Session::new(Replay::new([red_square_frame()]), Default::default());
        let button = red_button();
        let interval = Some(Duration::from_secs(5));
        assert!(session.appear(&button, Matching::color(), interval));
        assert!(!session.appear(&button, Matching::color(), interval));
        session.interval_reset(&button);
        assert!(session.appear(&button, Matching::color(), interval));
        assert!(!session.appear(&button, Matching::color(), interval));
        session.device_mut().advance(Duration::from_millis(5001));
        assert!(session.appear(&button, Matching::color(), interval));
        // Without an interval nothing is suppressed.
        assert!(session.appear(&button, Matching::color(), None));
        assert_eq!(session.device().checked().len(), 6);
    }

    #[test]
    fn click_with_diagnostic_screenshot() {
        let mut session = Session::new(Replay::new([red_square_frame()]), Default::default());
        let button = red_button();
        let start = session.device().now();
        let appeared = session
            .appear_then_click(&button, Matching::color(), None, Some(DEFAULT_SCREENSHOT_TAG))
            .unwrap();
        assert!(appeared);
        let device = session.device();
        assert_eq!(device.screenshots(), [DEFAULT_SCREENSHOT_TAG]);
        assert_eq!(device.captures(), 1);
        assert_eq!(device.clicks().len(), 1);
        assert_eq!(device.clicks()[0].area, button.click_area());
        assert!(device.now() - start >= Duration::from_secs(1));
    }

    #[test]
    fn no_click_when_absent() {
        let frame = RgbImage::from_pixel(20, 20, Pixel([0, 0, 0]));
        let mut session = Session::new(Replay::new([frame]), Default::default());
        let appeared = session
            .appear_then_click(&red_button(), Matching::color(), None, None)
            .unwrap();
        assert!(!appeared);
        assert!(session.device().clicks().is_empty());
    }

    #[test]
    fn click_follows_template_offset() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut noise =
            |_: u32, _: u32| Pixel([rng.random::<u8>(), rng.random::<u8>(), rng.random::<u8>()]);
        let reference = RgbImage::from_fn(40, 40, &mut noise);
        let button =
            Landmark::from_frame("noise", Rect::from_xywh(10, 10, 6, 6), &reference).unwrap();
        let mut frame = RgbImage::from_fn(40, 40, &mut noise);
        image::imageops::replace(&mut frame, button.template().unwrap(), 10, 14);

        let mut session = Session::new(Replay::new([frame]), Default::default());
        let matching = Matching::template_at(Offset::Vertical(6));
        assert!(session.appear_then_click(&button, matching, None, None).unwrap());
        assert_eq!(
            session.device().clicks()[0].area,
            Rect::from_xywh(10, 14, 6, 6)
        );
    }

    #[test]
    fn pixel_count_is_strictly_greater() {
        let color = Rgb::new(200, 30, 30);
        let area = Rect::from_xywh(0, 0, 10, 10);
        for (matching_pixels, expected) in [(51, true), (50, false)] {
            let mut frame = RgbImage::from_pixel(10, 10, Pixel([0, 0, 0]));
            for index in 0..matching_pixels {
                frame.put_pixel(index % 10, index / 10, Pixel([205, 28, 31]));
            }
            let session = Session::new(Replay::new([frame]), Default::default());
            assert_eq!(
                session.image_color_count(
                    area,
                    color,
                    DEFAULT_COUNT_SIMILARITY,
                    DEFAULT_PIXEL_COUNT
                ),
                expected,
                "{matching_pixels} matching pixels"
            );
        }
    }
}
