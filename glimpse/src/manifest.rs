//! Landmark definitions stored as JSON.
//!
//! ```json
//! [
//!     { "name": "confirm", "area": [100, 200, 80, 30], "template": "confirm.png" },
//!     { "name": "loading", "area": [0, 0, 20, 20], "color": [33, 33, 33] }
//! ]
//! ```
//!
//! Template paths are relative to the manifest file.

use {
    crate::{
        landmark::Landmark,
        replay::load_frame,
        types::{Rect, Rgb},
    },
    anyhow::{bail, Context as _},
    derive_more::Deref,
    serde::Deserialize,
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
    },
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LandmarkEntry {
    name: String,
    area: Rect,
    #[serde(default)]
    click_area: Option<Rect>,
    #[serde(default)]
    color: Option<Rgb>,
    #[serde(default)]
    template: Option<PathBuf>,
}

impl LandmarkEntry {
    fn into_landmark(self, base_dir: &Path) -> anyhow::Result<Landmark> {
        let mut landmark = match (self.template, self.color) {
            (Some(template), color) => {
                let patch = load_frame(&base_dir.join(template))?;
                let landmark = Landmark::from_template(self.name, self.area, patch)?;
                match color {
                    Some(color) => landmark.with_color(color),
                    None => landmark,
                }
            }
            (None, Some(color)) => Landmark::from_color(self.name, self.area, color)?,
            (None, None) => bail!("landmark {:?} needs a template or a color", self.name),
        };
        if let Some(click_area) = self.click_area {
            landmark = landmark.with_click_area(click_area)?;
        }
        Ok(landmark)
    }
}

/// Landmarks by name.
#[derive(Debug, Default, Clone, Deref)]
pub struct Landmarks(BTreeMap<String, Landmark>);

impl Landmarks {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs_err::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Self::from_json(&text, base_dir)
            .with_context(|| format!("failed to load landmarks from {:?}", path))
    }

    pub fn from_json(json: &str, base_dir: &Path) -> anyhow::Result<Self> {
        let entries: Vec<LandmarkEntry> = serde_json::from_str(json)?;
        let mut landmarks = BTreeMap::new();
        for entry in entries {
            let landmark = entry.into_landmark(base_dir)?;
            let name = landmark.name().to_owned();
            if landmarks.insert(name.clone(), landmark).is_some() {
                bail!("duplicate landmark name: {name:?}");
            }
        }
        Ok(Self(landmarks))
    }

    pub fn require(&self, name: &str) -> anyhow::Result<&Landmark> {
        self.0
            .get(name)
            .with_context(|| format!("unknown landmark: {name:?}"))
    }
}
