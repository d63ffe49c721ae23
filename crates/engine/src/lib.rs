//! The update loop and event bus (§4.4, §4.5), and the `GameHook` facade
//! (§6) that ties the driver, memory manager, and mapper together into the
//! one type a front end or edge server embeds.

pub mod bus;
pub mod config;
pub mod error;
pub mod gamehook;
pub mod ratelimit;
pub mod tick;

pub use bus::Filter;
pub use config::EngineConfig;
pub use error::EngineError;
pub use gamehook::{GameHook, MapperSummary};
