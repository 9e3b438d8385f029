use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RaytracingError {
    #[error("Acceleration structure has not been committed")]
    NotCommitted,

    #[error("Acceleration structure is already committed; geometry can no longer be attached")]
    AlreadyCommitted,

    #[error("Triangle {triangle} references vertex {index} but the geometry has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Geometry has non-finite vertex {0}")]
    NonFiniteVertex(usize),
}

pub type Result<T> = std::result::Result<T, RaytracingError>;
