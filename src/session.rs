use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::icmp::v4::echo::{
    decode_echo_reply, encode_echo_request, read_timestamp, round_trip_millis, timing_enabled,
};
use crate::icmp::v4::{EchoReply, Rejection, SequenceNumber, TSocket, MAX_PACKET_SIZE};
use crate::ping_data_buffer::PingDataBuffer;
use crate::ping_error::PingResult;
use crate::report::Report;
use crate::resolve::Target;
use crate::statistics::Statistics;
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::sync::mpsc;
use std::time::{Duration, Instant, SystemTime};

// Grace period after the last request when no reply has been seen at all.
const DEFAULT_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    Idle,
    Running,
    /// All requests are out; waiting for the remaining replies.
    Draining,
    Terminated,
}

#[derive(Debug)]
pub enum Outcome {
    Finished(Report),
    /// Halted from outside. No report was written.
    Interrupted,
}

/// One ping run against a single target.
///
/// The session owns its socket; dropping the session closes it.
pub struct Session<S, C, W> {
    config: SessionConfig,
    target: Target,
    socket: S,
    clock: C,
    out: W,
    identifier: u16,
    timing: bool,
    send_buf: Vec<u8>,
    recv_buf: Vec<u8>,
    requests: PingDataBuffer,
    stats: Statistics,
    states: Vec<State>,
    next_send: Option<Instant>,
    grace_deadline: Option<Instant>,
}

impl<S, C, W> Session<S, C, W>
where
    S: TSocket,
    C: Clock,
    W: Write,
{
    pub fn new(mut config: SessionConfig, target: Target, socket: S, clock: C, out: W) -> PingResult<Self> {
        let packet_size = config.packet_size()?;
        if config.count == Some(0) {
            config.count = None;
        }
        let timing = timing_enabled(config.datalen);
        #[allow(clippy::cast_possible_truncation)]
        let identifier = std::process::id() as u16;

        Ok(Session {
            config,
            target,
            socket,
            clock,
            out,
            identifier,
            timing,
            send_buf: vec![0u8; packet_size],
            recv_buf: vec![0u8; MAX_PACKET_SIZE],
            requests: PingDataBuffer::new(),
            stats: Statistics::new(),
            states: vec![State::Idle],
            next_send: None,
            grace_deadline: None,
        })
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn timing(&self) -> bool {
        self.timing
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn get_states(&self) -> Vec<State> {
        self.states.clone()
    }

    fn state(&self) -> State {
        *self.states.last().unwrap_or(&State::Idle)
    }

    fn enter(&mut self, state: State) {
        tracing::trace!("session {:?} -> {:?}", self.state(), state);
        self.states.push(state);
    }

    /// Runs until the reply limit or the grace period ends the session, or until `halt_rx`
    /// yields (or disconnects). The halt channel is polled once per receive timeout.
    ///
    /// The report is written once. Running a terminated session again returns it unwritten.
    pub fn run(&mut self, halt_rx: &mpsc::Receiver<()>) -> PingResult<Outcome> {
        if self.state() == State::Terminated {
            return Ok(Outcome::Finished(self.report()));
        }
        if self.state() == State::Idle {
            self.start()?;
        }

        while self.state() != State::Terminated {
            match halt_rx.try_recv() {
                Ok(()) | Err(mpsc::TryRecvError::Disconnected) => {
                    tracing::debug!("session halted");
                    return Ok(Outcome::Interrupted);
                }
                Err(mpsc::TryRecvError::Empty) => {}
            }
            self.step()?;
        }

        let report = self.report();
        writeln!(self.out)?;
        write!(self.out, "{report}")?;
        self.out.flush()?;
        Ok(Outcome::Finished(report))
    }

    fn start(&mut self) -> PingResult<()> {
        writeln!(
            self.out,
            "PING {} ({}): {} data bytes",
            self.target.name, self.target.addr, self.config.datalen
        )?;
        self.enter(State::Running);
        self.send_next();
        self.next_send = Some(self.clock.now() + self.config.interval);
        Ok(())
    }

    /// One loop iteration: fire a due deadline, then wait for one datagram.
    fn step(&mut self) -> PingResult<()> {
        self.on_deadline();
        if self.state() == State::Terminated {
            return Ok(());
        }

        let timeout = self.receive_timeout();
        self.receive_one(timeout)?;

        if self.reply_limit_reached() {
            self.enter(State::Terminated);
        }
        Ok(())
    }

    fn on_deadline(&mut self) {
        let now = self.clock.now();
        match self.state() {
            State::Running if self.next_send.is_some_and(|deadline| now >= deadline) => {
                if self.send_limit_reached() {
                    let grace = self.grace_period();
                    tracing::debug!("all requests sent, waiting {:?} for outstanding replies", grace);
                    self.next_send = None;
                    self.grace_deadline = Some(now + grace);
                    self.enter(State::Draining);
                } else {
                    self.send_next();
                    self.next_send = Some(now + self.config.interval);
                }
            }
            State::Draining if self.grace_deadline.is_some_and(|deadline| now >= deadline) => {
                self.enter(State::Terminated);
            }
            _ => {}
        }
    }

    fn send_limit_reached(&self) -> bool {
        self.config.count.is_some_and(|count| self.stats.transmitted() >= u64::from(count))
    }

    fn reply_limit_reached(&self) -> bool {
        self.config.count.is_some_and(|count| self.stats.received() >= u64::from(count))
    }

    fn grace_period(&self) -> Duration {
        if self.stats.received() == 0 {
            return DEFAULT_GRACE;
        }
        Duration::from_secs((2 * self.stats.max_time() / 1000).max(1))
    }

    fn receive_timeout(&self) -> Duration {
        let deadline = match self.state() {
            State::Running => self.next_send,
            State::Draining => self.grace_deadline,
            State::Idle | State::Terminated => None,
        };
        let now = self.clock.now();
        deadline.map_or(self.config.timeout, |deadline| {
            deadline.saturating_duration_since(now).min(self.config.timeout)
        })
    }

    fn send_next(&mut self) {
        let sequence_number = SequenceNumber::from_transmitted(self.stats.transmitted());
        let send_time = self.timing.then(|| self.clock.wall_time());

        let Some(n) = encode_echo_request(&mut self.send_buf, self.identifier, sequence_number, send_time) else {
            tracing::debug!("could not encode echo request {}", sequence_number);
            return;
        };
        let addr: socket2::SockAddr = SocketAddr::new(IpAddr::V4(self.target.addr), 0).into();
        match self.socket.send_to(&self.send_buf[..n], &addr) {
            Ok(written) if written > 0 => {
                self.stats.record_transmitted();
                self.requests.record_send(sequence_number, send_time);
                tracing::trace!("sent icmp_seq={} to {}", sequence_number, self.target.addr);
            }
            Ok(_) => tracing::debug!("failed to send ping packet: nothing written"),
            Err(e) => tracing::debug!("failed to send ping packet: {}", e),
        }
    }

    fn receive_one(&mut self, timeout: Duration) -> PingResult<()> {
        let (n, from) = match self.socket.recv_from(&mut self.recv_buf, timeout) {
            Ok(received) => received,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                return Ok(());
            }
            Err(e) => {
                tracing::debug!("error receiving packet: {}", e);
                return Ok(());
            }
        };
        let receive_time = self.clock.wall_time();

        match decode_echo_reply(&self.recv_buf[..n], self.identifier) {
            Ok(reply) => self.on_reply(n, from, reply, receive_time)?,
            Err(Rejection::ForeignIdentifier { identifier }) => {
                tracing::trace!("ignoring reply for identifier {} from {}", identifier, from);
            }
            Err(rejection) => tracing::debug!("{} bytes from {}: {}", n, from, rejection),
        }
        Ok(())
    }

    fn on_reply(&mut self, n: usize, from: IpAddr, reply: EchoReply, receive_time: SystemTime) -> PingResult<()> {
        // The count check keeps received <= transmitted for replies no longer in the buffer.
        let duplicate =
            self.stats.received() >= self.stats.transmitted() || !self.requests.mark_answered(reply.sequence_number);
        if duplicate {
            tracing::debug!("{} bytes from {}: duplicate icmp_seq={}", n, from, reply.sequence_number);
            return Ok(());
        }

        let trip_time = if self.timing { self.trip_time(reply.sequence_number, receive_time) } else { None };
        self.stats.record_reply(trip_time);

        write!(self.out, "{} bytes from {}: icmp_seq={}", n, from, reply.sequence_number)?;
        if let Some(trip_time) = trip_time {
            write!(self.out, " time={trip_time} ms")?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    // Falls back to the timestamp of the last request still in the send buffer when the
    // request's own send time is no longer known.
    fn trip_time(&self, sequence_number: SequenceNumber, receive_time: SystemTime) -> Option<u64> {
        self.requests
            .send_time(sequence_number)
            .or_else(|| read_timestamp(&self.send_buf))
            .map(|send_time| round_trip_millis(send_time, receive_time))
    }

    fn report(&self) -> Report {
        Report { target: self.target.name.clone(), summary: self.stats.summarize() }
    }
}
