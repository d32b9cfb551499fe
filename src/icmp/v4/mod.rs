mod checksum;
pub(crate) mod echo;
mod sequence_number;
pub(crate) mod socket;

pub use echo::{EchoReply, Rejection, ICMP_HEADER_SIZE, MAX_PACKET_SIZE, TIMESTAMP_SIZE};
pub use sequence_number::SequenceNumber;
pub use socket::raw_socket::RawSocket;
pub use socket::TSocket;
