//! Builder for [`crate::client::Driver`], in the same "accumulate config,
//! then build" shape the rest of this corpus uses for process wrappers.

use crate::client::Driver;
use crate::config::DriverConfig;
use std::time::Duration;

/// Quickly generates `with_<field>` setter methods on top of a plain struct
/// field, mirroring the `with!` macro pattern used elsewhere in this corpus
/// for builder-style configuration.
macro_rules! with {
    ($field:ident, $ty:ty) => {
        pub fn $field(mut self, $field: $ty) -> Self {
            self.config.$field = $field;
            self
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct DriverBuilder {
    config: DriverConfig,
}

impl DriverBuilder {
    pub fn new() -> Self {
        Self {
            config: DriverConfig::default(),
        }
    }

    with!(host, String);
    with!(port, u16);
    with!(request_timeout, Duration);
    with!(max_retries, u32);
    with!(retry_delay, Duration);
    with!(chunk_size, u32);

    pub fn build(self) -> Driver {
        Driver::new(self.config)
    }
}
