use shared::Address;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("driver unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("driver timed out reading {len} byte(s) at {addr}")]
    Timeout { addr: Address, len: u32 },

    #[error("driver is closed")]
    Closed,

    #[error("unknown memory block: {0:?}")]
    UnknownBlock(String),
}
