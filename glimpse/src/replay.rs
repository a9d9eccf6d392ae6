use {
    crate::{
        device::{Controller, Frame, FrameSource},
        landmark::Landmark,
        types::Rect,
    },
    anyhow::Context as _,
    image::ImageReader,
    std::{
        collections::VecDeque,
        path::{Path, PathBuf},
        time::{Duration, Instant},
    },
    tracing::info,
};

/// Default virtual time spent on each capture.
pub const DEFAULT_CAPTURE_STEP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedClick {
    pub name: String,
    pub area: Rect,
}

/// In-memory device replaying a fixed sequence of frames.
///
/// Each [`FrameSource::refresh`] moves to the next queued frame, or keeps the
/// last one when the queue is empty, and advances a virtual clock by the
/// capture step. [`Controller::sleep`] only advances the clock.
#[derive(Debug)]
pub struct Replay {
    current: Frame,
    queue: VecDeque<Frame>,
    now: Instant,
    capture_step: Duration,
    captures: usize,
    clicks: Vec<RecordedClick>,
    screenshots: Vec<String>,
    screenshot_dir: Option<PathBuf>,
    checked: Vec<String>,
}

impl Replay {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        let mut queue: VecDeque<Frame> = frames.into_iter().collect();
        let current = queue.pop_front().unwrap_or_default();
        Self {
            current,
            queue,
            now: Instant::now(),
            capture_step: DEFAULT_CAPTURE_STEP,
            captures: 0,
            clicks: Vec::new(),
            screenshots: Vec::new(),
            screenshot_dir: None,
            checked: Vec::new(),
        }
    }

    pub fn with_capture_step(mut self, step: Duration) -> Self {
        self.capture_step = step;
        self
    }

    /// Saves screenshots requested through [`Controller::save_screenshot`]
    /// under `dir`.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    /// Replaces the current frame without advancing the clock.
    pub fn set_frame(&mut self, frame: Frame) {
        self.current = frame;
    }

    /// Replaces the current frame with an image file.
    pub fn load_frame(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.current = load_frame(path.as_ref())?;
        Ok(())
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.queue.push_back(frame);
    }

    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
    }

    /// Number of frames captured through [`FrameSource::refresh`].
    pub fn captures(&self) -> usize {
        self.captures
    }

    pub fn clicks(&self) -> &[RecordedClick] {
        &self.clicks
    }

    pub fn screenshots(&self) -> &[String] {
        &self.screenshots
    }

    /// Names of landmarks passed to [`FrameSource::stuck_record_add`].
    pub fn checked(&self) -> &[String] {
        &self.checked
    }
}

impl FrameSource for Replay {
    fn frame(&self) -> &Frame {
        &self.current
    }

    fn refresh(&mut self) -> anyhow::Result<&Frame> {
        if let Some(frame) = self.queue.pop_front() {
            self.current = frame;
        }
        self.captures += 1;
        self.now += self.capture_step;
        Ok(&self.current)
    }

    fn stuck_record_add(&mut self, landmark: &Landmark) {
        self.checked.push(landmark.name().to_owned());
    }

    fn now(&self) -> Instant {
        self.now
    }
}

impl Controller for Replay {
    fn click(&mut self, name: &str, area: Rect) -> anyhow::Result<()> {
        self.clicks.push(RecordedClick {
            name: name.to_owned(),
            area,
        });
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) {
        self.now += duration;
    }

    fn save_screenshot(&mut self, tag: &str) -> anyhow::Result<()> {
        self.screenshots.push(tag.to_owned());
        if let Some(dir) = &self.screenshot_dir {
            let dir = dir.join(tag);
            fs_err::create_dir_all(&dir)?;
            let path = dir.join(format!("{:04}.png", self.screenshots.len()));
            info!("saving screenshot to {path:?}");
            self.current
                .save(&path)
                .with_context(|| format!("failed to save image {:?}", &path))?;
        }
        Ok(())
    }
}

pub fn load_frame(path: &Path) -> anyhow::Result<Frame> {
    let reader =
        ImageReader::open(path).with_context(|| format!("failed to open image {:?}", path))?;
    let image = reader
        .decode()
        .with_context(|| format!("failed to decode image {:?}", path))?;
    Ok(image.into_rgb8())
}

#[cfg(test)]
mod tests {
    use {super::*, image::Rgb as Pixel};

    fn solid(value: u8) -> Frame {
        Frame::from_pixel(4, 4, Pixel([value; 3]))
    }

    #[test]
    fn replays_frames_and_repeats_last() {
        let mut replay = Replay::new([solid(1), solid(2)]);
        let start = replay.now();
        assert_eq!(replay.frame().get_pixel(0, 0).0, [1; 3]);
        assert_eq!(replay.refresh().unwrap().get_pixel(0, 0).0, [2; 3]);
        assert_eq!(replay.refresh().unwrap().get_pixel(0, 0).0, [2; 3]);
        assert_eq!(replay.captures(), 2);
        assert_eq!(replay.now() - start, 2 * DEFAULT_CAPTURE_STEP);
    }

    #[test]
    fn saves_screenshots_by_tag() {
        let dir = tempfile::tempdir().unwrap();
        let mut replay = Replay::new([solid(7)]).with_screenshot_dir(dir.path());
        replay.save_screenshot("items").unwrap();
        let saved = dir.path().join("items").join("0001.png");
        assert_eq!(load_frame(&saved).unwrap(), solid(7));
        assert_eq!(replay.screenshots(), ["items"]);
    }
}
