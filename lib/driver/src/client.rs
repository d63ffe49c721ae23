//! The driver's request/reply client: a single serialized datagram channel,
//! chunked block reads, and bounded retries (§4.1).

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::protocol::{decode_read_reply, decode_write_reply, encode_read_request, encode_write_request};
use shared::{Address, MemoryBlock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
}

struct Inner {
    state: State,
    socket: Option<UdpSocket>,
}

/// Cheap to clone: every clone shares the same request mutex and socket, so
/// concurrent callers still serialize through one in-flight request at a
/// time (§4.1 "Concurrency" / §5 "single-writer, single-reader").
#[derive(Clone)]
pub struct Driver {
    config: DriverConfig,
    inner: Arc<Mutex<Inner>>,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(Inner {
                state: State::Closed,
                socket: None,
            })),
        }
    }

    pub fn builder() -> crate::builder::DriverBuilder {
        crate::builder::DriverBuilder::new()
    }

    /// `closed -> open on first use -> open` (§4.1 state machine).
    async fn ensure_open(&self, inner: &mut Inner) -> Result<(), DriverError> {
        if inner.state == State::Open && inner.socket.is_some() {
            return Ok(());
        }
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| DriverError::Unavailable {
                reason: e.to_string(),
            })?;
        socket
            .connect((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| DriverError::Unavailable {
                reason: e.to_string(),
            })?;
        inner.socket = Some(socket);
        inner.state = State::Open;
        Ok(())
    }

    /// One send+receive, bounded by `request_timeout`. A genuine socket
    /// error is irrecoverable and drops the driver to `closed`; a bare
    /// timeout is transient and leaves the state `open` (§4.1, §5).
    async fn roundtrip_once(
        &self,
        request: &str,
        addr: Address,
        len: u32,
    ) -> Result<String, DriverError> {
        let mut guard = self.inner.lock().await;
        self.ensure_open(&mut guard).await?;

        let outcome = {
            let socket = guard
                .socket
                .as_ref()
                .expect("ensure_open just populated the socket");
            let io_attempt = async {
                socket.send(request.as_bytes()).await?;
                let mut buf = vec![0u8; 8192];
                let n = socket.recv(&mut buf).await?;
                Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf[..n]).into_owned())
            };
            timeout(self.config.request_timeout, io_attempt).await
        };

        match outcome {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(io_err)) => {
                guard.state = State::Closed;
                guard.socket = None;
                Err(DriverError::Unavailable {
                    reason: io_err.to_string(),
                })
            }
            Err(_elapsed) => Err(DriverError::Timeout { addr, len }),
        }
    }

    /// Retries one chunk up to `max_retries + 1` total attempts with
    /// `retry_delay` between them (§4.1 "Retries").
    async fn roundtrip_with_retries(
        &self,
        request: &str,
        addr: Address,
        len: u32,
    ) -> Result<String, DriverError> {
        let strategy =
            FixedInterval::from_millis(self.config.retry_delay.as_millis() as u64)
                .take(self.config.max_retries as usize);

        let mut attempt_no = 0u32;
        let result = Retry::spawn(strategy, || {
            attempt_no += 1;
            let attempt = attempt_no;
            async move {
                tracing::debug!(%addr, len, attempt, "driver: chunk attempt");
                self.roundtrip_once(request, addr, len).await
            }
        })
        .await;

        result.map_err(|last_err| {
            tracing::warn!(%addr, len, error = %last_err, "driver: chunk exhausted retries");
            DriverError::Unavailable {
                reason: format!("chunk at {addr} (len {len}) failed after retries: {last_err}"),
            }
        })
    }

    fn chunk_ranges(&self, start: Address, total_len: u32) -> Vec<(Address, u32)> {
        let chunk_size = self.config.chunk_size.max(1);
        let mut ranges = Vec::new();
        let mut offset = 0u32;
        while offset < total_len {
            let this_len = chunk_size.min(total_len - offset);
            let addr = start
                .checked_add(offset)
                .expect("chunk offset overflowed a 32-bit address");
            ranges.push((addr, this_len));
            offset += this_len;
        }
        ranges
    }

    /// `ReadMemory(addr, len) -> bytes` (§4.1). Splits into sequential
    /// sub-reads when `len` exceeds the configured chunk size and
    /// reassembles them in address order.
    pub async fn read_memory(&self, addr: Address, len: u32) -> Result<Vec<u8>, DriverError> {
        let mut out = Vec::with_capacity(len as usize);
        for (chunk_addr, chunk_len) in self.chunk_ranges(addr, len) {
            let request = encode_read_request(chunk_addr, chunk_len);
            let reply = self
                .roundtrip_with_retries(&request, chunk_addr, chunk_len)
                .await?;
            let decoded = decode_read_reply(&reply, chunk_addr).map_err(|e| {
                DriverError::Unavailable {
                    reason: format!("malformed reply for chunk at {chunk_addr}: {e}"),
                }
            })?;
            if decoded.any_unreadable() {
                tracing::warn!(addr = %chunk_addr, len = chunk_len, "driver: some bytes unreadable, reported as 0x00");
            }
            out.extend_from_slice(&decoded.bytes);
        }
        Ok(out)
    }

    /// `ReadMemoryBlocks(blocks[]) -> {block_name -> bytes}` (§4.1).
    pub async fn read_memory_blocks(
        &self,
        blocks: &[MemoryBlock],
    ) -> Result<HashMap<String, Vec<u8>>, DriverError> {
        let mut out = HashMap::with_capacity(blocks.len());
        for block in blocks {
            let bytes = self.read_memory(block.start, block.len()).await?;
            out.insert(block.name.clone(), bytes);
        }
        Ok(out)
    }

    /// `WriteBytes(addr, bytes)` (§4.1).
    pub async fn write_bytes(&self, addr: Address, bytes: &[u8]) -> Result<(), DriverError> {
        let mut offset = 0usize;
        for (chunk_addr, chunk_len) in self.chunk_ranges(addr, bytes.len() as u32) {
            let chunk = &bytes[offset..offset + chunk_len as usize];
            let request = encode_write_request(chunk_addr, chunk);
            let reply = self
                .roundtrip_with_retries(&request, chunk_addr, chunk_len)
                .await?;
            decode_write_reply(&reply, chunk_addr).map_err(|e| DriverError::Unavailable {
                reason: format!("malformed write ack for chunk at {chunk_addr}: {e}"),
            })?;
            offset += chunk_len as usize;
        }
        Ok(())
    }

    /// Returns the driver to `closed`. The next call reopens it
    /// transparently (§4.1).
    pub async fn close(&self) {
        let mut guard = self.inner.lock().await;
        guard.socket = None;
        guard.state = State::Closed;
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.state == State::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket as TestSocket;

    /// Spawns a tiny in-process stand-in for the emulator's memory server:
    /// echoes back whatever byte pattern the test configures for each
    /// address, so the chunking/retry machinery can be exercised without a
    /// real emulator.
    async fn spawn_mock_emulator(memory: Vec<u8>) -> u16 {
        let socket = TestSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                let Ok((n, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let request = String::from_utf8_lossy(&buf[..n]).into_owned();
                let mut tokens = request.split_whitespace();
                match tokens.next() {
                    Some("READ_CORE_MEMORY") => {
                        let addr_hex = tokens.next().unwrap();
                        let len: usize = tokens.next().unwrap().parse().unwrap();
                        let addr = u32::from_str_radix(addr_hex, 16).unwrap() as usize;
                        let mut reply = format!("READ_CORE_MEMORY {addr_hex}");
                        for i in 0..len {
                            let byte = memory.get(addr + i).copied().unwrap_or(0);
                            reply.push(' ');
                            reply.push_str(&format!("{byte:02x}"));
                        }
                        let _ = socket.send_to(reply.as_bytes(), peer).await;
                    }
                    Some("WRITE_CORE_MEMORY") => {
                        let addr_hex = tokens.next().unwrap();
                        let reply = format!("WRITE_CORE_MEMORY {addr_hex}");
                        let _ = socket.send_to(reply.as_bytes(), peer).await;
                    }
                    _ => {}
                }
            }
        });
        port
    }

    fn test_config(port: u16) -> DriverConfig {
        DriverConfig {
            host: "127.0.0.1".to_string(),
            port,
            chunk_size: 4,
            ..DriverConfig::default()
        }
    }

    #[tokio::test]
    async fn reads_bytes_within_a_single_chunk() {
        let port = spawn_mock_emulator(vec![0x2c, 0x01]).await;
        let driver = Driver::new(test_config(port));
        let bytes = driver.read_memory(Address(0), 2).await.unwrap();
        assert_eq!(bytes, vec![0x2c, 0x01]);
    }

    #[tokio::test]
    async fn reassembles_a_read_spanning_multiple_chunks_in_order() {
        let memory: Vec<u8> = (0u8..16).collect();
        let port = spawn_mock_emulator(memory.clone()).await;
        let driver = Driver::new(test_config(port)); // chunk_size=4
        let bytes = driver.read_memory(Address(0), 10).await.unwrap();
        assert_eq!(bytes, memory[0..10]);
    }

    #[tokio::test]
    async fn write_then_state_is_open() {
        let port = spawn_mock_emulator(vec![0; 8]).await;
        let driver = Driver::new(test_config(port));
        driver.write_bytes(Address(0), &[1, 2, 3]).await.unwrap();
        assert!(driver.is_open().await);
    }

    #[tokio::test]
    async fn exhausting_retries_against_a_dead_port_reports_unavailable() {
        let mut config = test_config(1); // nothing listens on port 1
        config.request_timeout = std::time::Duration::from_millis(20);
        config.retry_delay = std::time::Duration::from_millis(1);
        config.max_retries = 2;
        let driver = Driver::new(config);
        let err = driver.read_memory(Address(0), 1).await.unwrap_err();
        assert!(matches!(err, DriverError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn close_then_reopen_transparently() {
        let port = spawn_mock_emulator(vec![0x42]).await;
        let driver = Driver::new(test_config(port));
        driver.read_memory(Address(0), 1).await.unwrap();
        driver.close().await;
        assert!(!driver.is_open().await);
        let bytes = driver.read_memory(Address(0), 1).await.unwrap();
        assert_eq!(bytes, vec![0x42]);
        assert!(driver.is_open().await);
    }
}
