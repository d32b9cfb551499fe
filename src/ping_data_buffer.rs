use crate::icmp::v4::SequenceNumber;
use std::time::SystemTime;

const SLOTS: usize = 64;

#[derive(Clone, Copy)]
struct Request {
    sequence_number: SequenceNumber,
    send_time: Option<SystemTime>,
    answered: bool,
}

/// The most recent requests, keyed by `sequence % SLOTS`.
///
/// Each slot remembers which sequence number wrote it, so a reply for a request that has
/// already been overwritten is reported as unknown rather than matched against a newer send.
pub(crate) struct PingDataBuffer {
    slots: [Option<Request>; SLOTS],
}

impl PingDataBuffer {
    pub(crate) fn new() -> Self {
        Self { slots: [None; SLOTS] }
    }

    pub(crate) fn record_send(&mut self, sequence_number: SequenceNumber, send_time: Option<SystemTime>) {
        self.slots[slot(sequence_number)] = Some(Request { sequence_number, send_time, answered: false });
    }

    pub(crate) fn send_time(&self, sequence_number: SequenceNumber) -> Option<SystemTime> {
        self.request(sequence_number).and_then(|request| request.send_time)
    }

    /// Marks `sequence_number` as answered. Returns `false` if it already was.
    ///
    /// Sequence numbers no longer held in the buffer cannot be checked and are accepted.
    pub(crate) fn mark_answered(&mut self, sequence_number: SequenceNumber) -> bool {
        match &mut self.slots[slot(sequence_number)] {
            Some(request) if request.sequence_number == sequence_number => {
                !std::mem::replace(&mut request.answered, true)
            }
            _ => true,
        }
    }

    fn request(&self, sequence_number: SequenceNumber) -> Option<&Request> {
        self.slots[slot(sequence_number)].as_ref().filter(|request| request.sequence_number == sequence_number)
    }
}

fn slot(sequence_number: SequenceNumber) -> usize {
    usize::from(u16::from(sequence_number)) % SLOTS
}
