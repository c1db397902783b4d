use thiserror::Error;

/// Errors from the flat key/value view of a [`crate::params::ParameterSet`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("unknown parameter `{key}` for scene kind {kind}")]
    UnknownKey { key: String, kind: &'static str },

    #[error("parameter `{key}` expects a {expected} value")]
    TypeMismatch {
        key: String,
        expected: &'static str,
    },

    #[error("invalid color `{0}` (expected #rrggbb)")]
    InvalidColor(String),

    #[error("cannot parse `{raw}` for parameter `{key}`")]
    Parse { key: String, raw: String },
}

/// Errors surfaced by render backends.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("framebuffer is {actual_w}x{actual_h}, frame expects {expected_w}x{expected_h}")]
    SizeMismatch {
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },

    #[error("render backend unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "gpu")]
    #[error(transparent)]
    Gpu(#[from] crate::gpu::GpuError),
}
