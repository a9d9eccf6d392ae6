use {
    crate::{
        timer::Timer,
        types::{ColorDistance, Similarity},
    },
    anyhow::{bail, Context as _},
    serde::{Deserialize, Serialize},
    std::{path::Path, time::Duration},
};

/// Detection defaults used when a call does not specify its own values.
///
/// Durations are stored in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Default template search expansion. An offset of `n` searches ±3 px
    /// horizontally and ±`n` px vertically around the landmark area.
    pub button_offset: u32,
    pub button_match_similarity: Similarity,
    pub color_similar_threshold: ColorDistance,
    pub wait_before_saving_screenshot: f32,
    pub stable_interval: f32,
    pub stable_count: u32,
    pub stable_timeout: f32,
    pub stable_timeout_count: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            button_offset: 30,
            button_match_similarity: Similarity::new_unchecked(0.85),
            color_similar_threshold: ColorDistance(10),
            wait_before_saving_screenshot: 1.0,
            stable_interval: 0.3,
            stable_count: 1,
            stable_timeout: 5.0,
            stable_timeout_count: 10,
        }
    }
}

impl DetectionConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs_err::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("invalid config {:?}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("wait_before_saving_screenshot", self.wait_before_saving_screenshot),
            ("stable_interval", self.stable_interval),
            ("stable_timeout", self.stable_timeout),
        ] {
            if Duration::try_from_secs_f32(value).is_err() {
                bail!("{name} must be a non-negative number of seconds, got {value}");
            }
        }
        Ok(())
    }

    pub fn wait_before_saving_screenshot(&self) -> Duration {
        seconds(self.wait_before_saving_screenshot)
    }

    /// Timer that has to be reached while a region stays unchanged.
    pub fn stable_timer(&self) -> Timer {
        Timer::with_count(seconds(self.stable_interval), self.stable_count)
    }

    pub fn stable_timeout_timer(&self) -> Timer {
        Timer::with_count(seconds(self.stable_timeout), self.stable_timeout_count)
    }
}

fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or_default()
}
