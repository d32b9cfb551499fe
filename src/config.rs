use crate::icmp::v4::{ICMP_HEADER_SIZE, MAX_PACKET_SIZE};
use crate::ping_error::{PingError, PingResult};
use std::time::Duration;

pub const DEFAULT_DATALEN: usize = 56;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionConfig {
    /// Payload bytes per request.
    pub datalen: usize,
    /// Stop after this many replies. `None` pings until interrupted.
    pub count: Option<u32>,
    /// Time between two requests.
    pub interval: Duration,
    /// Longest single wait for an inbound datagram.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            datalen: DEFAULT_DATALEN,
            count: None,
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    /// Header plus payload, checked against the buffer capacity.
    pub fn packet_size(&self) -> PingResult<usize> {
        let size = self.datalen.saturating_add(ICMP_HEADER_SIZE);
        if size > MAX_PACKET_SIZE {
            return Err(PingError::PacketTooLarge { size, capacity: MAX_PACKET_SIZE });
        }
        Ok(size)
    }
}
