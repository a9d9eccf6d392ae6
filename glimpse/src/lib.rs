//! Screenshot-driven UI automation.
//!
//! A [`Session`] owns a [`Device`] that captures frames and performs taps. It
//! checks whether [`Landmark`]s are present on the current frame, gates
//! repeated detections with per-landmark intervals, and offers wait loops
//! that block until a landmark appears, disappears or its area stops
//! changing.

pub mod config;
mod detector;
pub mod device;
mod error;
mod interval;
mod landmark;
pub mod manifest;
pub mod matching;
pub mod replay;
mod session;
pub mod timer;
pub mod types;
mod wait;

pub use crate::{
    config::DetectionConfig,
    detector::{detect, Appearance, Matching, Offset, Score},
    device::{Controller, Device, Frame, FrameSource},
    error::Error,
    interval::IntervalRegistry,
    landmark::{Landmark, LandmarkKind, Target},
    manifest::Landmarks,
    replay::Replay,
    session::{
        CancelToken, Session, DEFAULT_COUNT_SIMILARITY, DEFAULT_PIXEL_COUNT,
        DEFAULT_SCREENSHOT_TAG,
    },
    timer::Timer,
    wait::{Stability, StableOptions},
};
