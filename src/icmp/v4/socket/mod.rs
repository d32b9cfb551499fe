use std::{io, net::IpAddr, time::Duration};

pub(crate) mod raw_socket;

/// Transport used by a session. Closing is dropping.
pub trait TSocket {
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize>;

    /// Blocks for at most `timeout`. Running out of time is reported as `WouldBlock` or
    /// `TimedOut`, depending on the platform.
    fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, IpAddr)>;
}
