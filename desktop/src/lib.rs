//! Drives the primary desktop monitor: captures it with `xcap` and taps with
//! `enigo`.

mod stuck;

pub use crate::stuck::{StuckRecord, DEFAULT_STUCK_LIMIT};

use {
    anyhow::{bail, Context as _},
    chrono::Local,
    enigo::{Button, Coordinate, Direction, Enigo, Mouse},
    glimpse::{types::Rect, Controller, Frame, FrameSource, Landmark},
    image::DynamicImage,
    rand::Rng,
    std::{
        path::PathBuf,
        thread::sleep,
        time::{Duration, Instant},
    },
    tracing::{debug, info},
};

const CLICK_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct DesktopSettings {
    /// Index into the list of monitors reported by the system.
    pub monitor: usize,
    /// Root directory of screenshots saved with
    /// [`Controller::save_screenshot`].
    pub screenshot_dir: PathBuf,
    /// How long landmarks may be waited for without a tap in between.
    pub stuck_limit: Duration,
    /// Pause after each tap.
    pub click_delay: Duration,
}

impl Default for DesktopSettings {
    fn default() -> Self {
        Self {
            monitor: 0,
            screenshot_dir: PathBuf::from("screenshots"),
            stuck_limit: DEFAULT_STUCK_LIMIT,
            click_delay: CLICK_DELAY,
        }
    }
}

pub struct Desktop {
    monitor: xcap::Monitor,
    /// Position of the monitor in global coordinates.
    origin: (i32, i32),
    scale_factor: f32,
    enigo: Enigo,
    frame: Frame,
    stuck: StuckRecord,
    settings: DesktopSettings,
}

impl Desktop {
    pub fn new(settings: DesktopSettings) -> anyhow::Result<Self> {
        let monitor = xcap::Monitor::all()?
            .into_iter()
            .nth(settings.monitor)
            .with_context(|| format!("monitor #{} not found", settings.monitor))?;
        let origin = (monitor.x()?, monitor.y()?);
        let scale_factor = monitor.scale_factor()?;
        debug!(
            "using monitor {:?} at {origin:?}, scale factor {scale_factor}",
            monitor.name()?
        );
        let frame = capture(&monitor)?;
        Ok(Self {
            monitor,
            origin,
            scale_factor,
            enigo: Enigo::new(&enigo::Settings::default())?,
            frame,
            stuck: StuckRecord::new(settings.stuck_limit),
            settings,
        })
    }

    /// Converts a position on the captured frame to a global pointer position.
    fn to_global(&self, x: i32, y: i32) -> (i32, i32) {
        let scale = if self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        (
            self.origin.0 + (x as f32 / scale).round() as i32,
            self.origin.1 + (y as f32 / scale).round() as i32,
        )
    }
}

fn capture(monitor: &xcap::Monitor) -> anyhow::Result<Frame> {
    let image = monitor
        .capture_image()
        .context("failed to capture monitor")?;
    Ok(DynamicImage::ImageRgba8(image).into_rgb8())
}

impl FrameSource for Desktop {
    fn frame(&self) -> &Frame {
        &self.frame
    }

    fn refresh(&mut self) -> anyhow::Result<&Frame> {
        self.stuck.check(Instant::now())?;
        self.frame = capture(&self.monitor)?;
        Ok(&self.frame)
    }

    fn stuck_record_add(&mut self, landmark: &Landmark) {
        self.stuck.add(landmark.name(), Instant::now());
    }
}

impl Controller for Desktop {
    fn click(&mut self, name: &str, area: Rect) -> anyhow::Result<()> {
        if area.is_empty() {
            bail!("cannot click {name}: empty area {area}");
        }
        let mut rng = rand::rng();
        let x = rng.random_range(area.left()..area.right());
        let y = rng.random_range(area.top()..area.bottom());
        let (global_x, global_y) = self.to_global(x, y);
        debug!("click {name} at ({x}, {y}), global ({global_x}, {global_y})");
        self.enigo.move_mouse(global_x, global_y, Coordinate::Abs)?;
        self.enigo.button(Button::Left, Direction::Click)?;
        self.stuck.clear();
        sleep(self.settings.click_delay);
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) {
        sleep(duration);
    }

    fn save_screenshot(&mut self, tag: &str) -> anyhow::Result<()> {
        let dir = self.settings.screenshot_dir.join(tag);
        fs_err::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.png", Local::now().format("%Y%m%d_%H%M%S_%3f")));
        self.frame
            .save(&path)
            .with_context(|| format!("failed to save screenshot to {}", path.display()))?;
        info!("saved screenshot {}", path.display());
        Ok(())
    }
}
