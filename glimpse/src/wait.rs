use {
    crate::{
        config::DetectionConfig,
        detector::{find_template, Matching},
        device::Device,
        landmark::Landmark,
        matching::crop,
        session::Session,
        timer::Timer,
        types::ColorDistance,
        Error, Frame,
    },
    std::time::Duration,
    strum::Display,
    tracing::{debug, warn},
};

/// How [`Session::wait_until_stable`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stability {
    /// The area stayed unchanged for the whole stability timer.
    Stable,
    /// The timeout timer was reached first.
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
pub struct StableOptions {
    /// Reached while the area stays unchanged.
    pub stability: Timer,
    /// Ends the wait regardless of stability.
    pub timeout: Timer,
    /// Evaluate the frame the device already holds before capturing a new one.
    pub skip_first_screenshot: bool,
}

impl StableOptions {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            stability: config.stable_timer(),
            timeout: config.stable_timeout_timer(),
            skip_first_screenshot: true,
        }
    }
}

enum Tracking {
    Uninitialized,
    Tracking { baseline: Frame },
}

impl<D: Device> Session<D> {
    /// Captures a new frame unless `skip` is set, which is consumed.
    fn next_frame(&mut self, skip: &mut bool) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if *skip {
            *skip = false;
        } else {
            self.device.refresh().map_err(Error::Capture)?;
        }
        Ok(())
    }

    /// Blocks until `landmark` appears. There is no timeout, see
    /// [`Session::wait_until_appear_within`] for a bounded wait.
    pub fn wait_until_appear(
        &mut self,
        landmark: &Landmark,
        matching: Matching,
        mut skip_first_screenshot: bool,
    ) -> Result<(), Error> {
        loop {
            self.next_frame(&mut skip_first_screenshot)?;
            if self.appear(landmark, matching, None) {
                return Ok(());
            }
        }
    }

    pub fn wait_until_appear_then_click(
        &mut self,
        landmark: &Landmark,
        matching: Matching,
        skip_first_screenshot: bool,
    ) -> Result<(), Error> {
        self.wait_until_appear(landmark, matching, skip_first_screenshot)?;
        self.click(landmark)
    }

    /// Blocks until `landmark` is no longer present.
    pub fn wait_until_disappear(
        &mut self,
        landmark: &Landmark,
        matching: Matching,
        mut skip_first_screenshot: bool,
    ) -> Result<(), Error> {
        loop {
            self.next_frame(&mut skip_first_screenshot)?;
            if !self.appear(landmark, matching, None) {
                return Ok(());
            }
        }
    }

    /// Waits for `landmark` for at most `timeout`. Returns whether it appeared.
    pub fn wait_until_appear_within(
        &mut self,
        landmark: &Landmark,
        matching: Matching,
        timeout: Duration,
        mut skip_first_screenshot: bool,
    ) -> Result<bool, Error> {
        let mut timer = Timer::new(timeout);
        timer.restart(self.device.now());
        loop {
            self.next_frame(&mut skip_first_screenshot)?;
            if self.appear(landmark, matching, None) {
                return Ok(true);
            }
            if timer.reached(self.device.now()) {
                debug!("{landmark} did not appear within {timeout:?}");
                return Ok(false);
            }
        }
    }

    /// Waits until the content of the landmark area stops changing.
    ///
    /// The first frame becomes the baseline. Every following frame is compared
    /// with the baseline at the exact position. A single-color area only
    /// matches a baseline of exactly the same color. A match ticks the stability
    /// timer, a mismatch makes the frame the new baseline and restarts it.
    /// The timeout does not raise an error, it is reported as
    /// [`Stability::TimedOut`].
    pub fn wait_until_stable(
        &mut self,
        landmark: &Landmark,
        options: StableOptions,
    ) -> Result<Stability, Error> {
        let StableOptions {
            stability: mut stable_timer,
            mut timeout,
            mut skip_first_screenshot,
        } = options;
        let area = landmark.area();
        let similarity = self.config.button_match_similarity;
        let mut state = Tracking::Uninitialized;
        timeout.restart(self.device.now());

        loop {
            self.next_frame(&mut skip_first_screenshot)?;
            let now = self.device.now();
            let frame = self.device.frame();

            state = match state {
                Tracking::Tracking { baseline } => {
                    let unchanged = find_template(
                        frame,
                        area,
                        &baseline,
                        (0, 0),
                        similarity,
                        ColorDistance(0),
                    )
                    .appeared;
                    if unchanged {
                        if stable_timer.reached(now) {
                            return Ok(Stability::Stable);
                        }
                        Tracking::Tracking { baseline }
                    } else {
                        stable_timer.restart(now);
                        Tracking::Tracking {
                            baseline: crop(frame, area),
                        }
                    }
                }
                Tracking::Uninitialized => {
                    stable_timer.restart(now);
                    Tracking::Tracking {
                        baseline: crop(frame, area),
                    }
                }
            };

            if timeout.reached(now) {
                warn!(
                    "wait_until_stable({landmark}) timed out after {:?}",
                    timeout.elapsed(now)
                );
                return Ok(Stability::TimedOut);
            }
        }
    }
}
