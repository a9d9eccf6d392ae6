//! Contracts of the collaborators a [`Session`](crate::Session) drives.

use {
    crate::{landmark::Landmark, types::Rect},
    image::RgbImage,
    std::time::{Duration, Instant},
};

/// A captured image of the controlled surface.
pub type Frame = RgbImage;

pub trait FrameSource {
    /// The most recently captured frame.
    fn frame(&self) -> &Frame;

    /// Captures a new frame, replacing the current one. May block.
    fn refresh(&mut self) -> anyhow::Result<&Frame>;

    /// Called every time a landmark is checked, before it is evaluated.
    ///
    /// Used by device backends to notice a UI that stopped responding while
    /// the same landmarks keep being waited for.
    fn stuck_record_add(&mut self, _landmark: &Landmark) {}

    /// Current time as seen by this source.
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub trait Controller {
    /// Taps somewhere inside `area`.
    fn click(&mut self, name: &str, area: Rect) -> anyhow::Result<()>;

    fn sleep(&mut self, duration: Duration);

    /// Stores the current frame for later inspection, grouped by `tag`.
    fn save_screenshot(&mut self, tag: &str) -> anyhow::Result<()>;
}

pub trait Device: FrameSource + Controller {}

impl<T: FrameSource + Controller + ?Sized> Device for T {}
