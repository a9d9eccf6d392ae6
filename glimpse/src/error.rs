use {crate::types::Rect, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error("wait cancelled")]
    Cancelled,
    #[error("failed to capture a frame: {0:#}")]
    Capture(anyhow::Error),
    #[error("failed to perform an action: {0:#}")]
    Action(anyhow::Error),
    #[error("landmark {name:?} has an empty area {area}")]
    InvalidArea { name: String, area: Rect },
    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("template of landmark {name:?} is {actual:?}, but its area is {expected:?}")]
    TemplateSize {
        name: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}
