use std::time::Duration;

/// `{ driver: {host, port, request_timeout, max_retries, retry_delay} }`
/// from §6's configuration struct.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Block reads larger than this are split into sequential sub-reads and
    /// reassembled in address order (§4.1 "Chunking").
    pub chunk_size: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 55355,
            request_timeout: Duration::from_millis(500),
            max_retries: 3,
            retry_delay: Duration::from_millis(50),
            chunk_size: 512,
        }
    }
}
