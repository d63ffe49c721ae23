//! Errors the `GameHook` facade returns (§6).

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no mapper is currently loaded")]
    MapperNotLoaded,

    #[error("unknown property: {0:?}")]
    PropertyUnknown(String),

    #[error("property {0:?} is read-only")]
    PropertyReadOnly(String),

    #[error("property {0:?} is computed and cannot be written directly")]
    PropertyComputed(String),

    #[error("validation failed for property write: {0}")]
    Validation(String),

    #[error("unknown mapper: {0:?}")]
    MapperUnknown(String),

    #[error(transparent)]
    Mapper(#[from] mapper::MapperError),

    #[error(transparent)]
    Driver(#[from] driver::DriverError),

    #[error("failed to read mapper directory: {0}")]
    Io(#[from] std::io::Error),
}
