#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

//! A minimal ICMP echo client: one IPv4 target, one request per interval, replies matched by
//! identifier and timed against the request's send timestamp.

pub use clock::{Clock, SystemClock};
pub use config::{SessionConfig, DEFAULT_DATALEN};
pub use icmp::v4::{
    EchoReply, RawSocket, Rejection, SequenceNumber, TSocket, ICMP_HEADER_SIZE, MAX_PACKET_SIZE, TIMESTAMP_SIZE,
};
pub use ping_error::{GenericError, PingError, PingResult};
pub use report::Report;
pub use resolve::{resolve, Target};
pub use session::{Outcome, Session, State};
pub use statistics::{RoundTrip, Statistics, Summary};

mod clock;
mod config;
mod icmp;
mod ping_data_buffer;
mod ping_error;
mod report;
mod resolve;
mod session;
mod statistics;
