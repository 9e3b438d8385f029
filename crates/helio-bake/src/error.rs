use helio_core::HelioError;
use helio_raytracing::RaytracingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BakeError {
    #[error("Invalid lightmap baking settings: {0}")]
    InvalidSettings(String),

    #[error("Failed to load {kind} '{path}': {reason}")]
    ResourceLoad {
        kind: &'static str,
        path: String,
        reason: String,
    },

    /// The graphics host could not begin a frame. The page may be captured again.
    #[error("Graphics frame unavailable")]
    FrameUnavailable,

    #[error("Lightmap {index} does not exist ({count} lightmaps)")]
    LightmapIndexOutOfRange { index: usize, count: usize },

    #[error("No lightmap G-buffer has been captured")]
    NoCapturedLightmap,

    #[error("Raytracing scene has not been cooked")]
    RaytracingSceneNotCooked,

    /// Internal fault; the baking session must be abandoned.
    #[error("Lightmap allocator invariant violated: {0}")]
    AllocatorInvariant(String),

    #[error("Model '{model}' has no usable '{key}' metadata")]
    MissingModelMetadata { model: String, key: String },

    #[error("Model '{model}' cannot be imported: {reason}")]
    InvalidModel { model: String, reason: String },

    #[error("Render target '{name}' holds {actual} bytes, expected {expected}")]
    RenderTargetMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Graphics host error: {0}")]
    Host(String),

    #[error(transparent)]
    Raytracing(#[from] RaytracingError),

    #[error(transparent)]
    Core(#[from] HelioError),
}

pub type Result<T> = std::result::Result<T, BakeError>;
