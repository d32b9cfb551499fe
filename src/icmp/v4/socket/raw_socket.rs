use super::TSocket;
use socket2::{Domain, Protocol, Type};
use std::cell::Cell;
use std::io;
use std::mem::MaybeUninit;
use std::net::IpAddr;
use std::time::Duration;

/// Raw ICMPv4 socket. Needs root or `CAP_NET_RAW`.
///
/// Received datagrams include the IP header.
pub struct RawSocket {
    socket: socket2::Socket,
    read_timeout: Cell<Duration>,
}

impl RawSocket {
    pub fn new(timeout: Duration) -> Result<Self, io::Error> {
        tracing::trace!("creating RawSocket");
        let socket = socket2::Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        let timeout = clamp_timeout(timeout);
        socket.set_read_timeout(Some(timeout))?;
        Ok(RawSocket { socket, read_timeout: Cell::new(timeout) })
    }
}

impl TSocket for RawSocket {
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, IpAddr)> {
        let timeout = clamp_timeout(timeout);
        if self.read_timeout.get() != timeout {
            self.socket.set_read_timeout(Some(timeout))?;
            self.read_timeout.set(timeout);
        }

        // Socket2 guarantees it never writes uninitialized bytes into the buffer, so an
        // initialized `&mut [u8]` may be viewed as `&mut [MaybeUninit<u8>]`.
        // https://docs.rs/socket2/0.4.7/socket2/struct.Socket.html#method.recv
        let (n, socket_addr) = self
            .socket
            .recv_from(unsafe { &mut *(std::ptr::addr_of_mut!(*buf) as *mut [MaybeUninit<u8>]) })?;
        let ip = socket_addr
            .as_socket()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "datagram from a non-IP address"))?
            .ip();
        Ok((n, ip))
    }
}

// A zero read timeout is rejected by the OS.
fn clamp_timeout(timeout: Duration) -> Duration {
    timeout.max(Duration::from_millis(1))
}
