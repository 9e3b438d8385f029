use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelioError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Model '{model}' has no '{key}' metadata")]
    MissingMetadata { model: String, key: String },

    #[error("Model '{model}' stores '{key}' metadata with an unexpected type")]
    InvalidMetadata { model: String, key: String },

    #[error("Entity {0} does not exist")]
    EntityNotFound(u64),
}

pub type Result<T> = std::result::Result<T, HelioError>;
