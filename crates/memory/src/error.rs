use shared::Address;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("address range {addr}+{len} is not covered by any memory block")]
    Unmapped { addr: Address, len: u32 },

    #[error("property is not freezable")]
    NotFreezable,
}
