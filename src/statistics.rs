/// Running totals of one session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Statistics {
    transmitted: u64,
    received: u64,
    min_time: u64,
    max_time: u64,
    total_time: u64,
}

/// Round-trip times in whole milliseconds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoundTrip {
    pub min: u64,
    pub avg: u64,
    pub max: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Summary {
    pub transmitted: u64,
    pub received: u64,
    pub loss_percent: u64,
    /// Present once at least one timed reply was recorded.
    pub round_trip: Option<RoundTrip>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    // Larger than any real round trip; replaced by the first timed reply.
    const MIN_TIME_SENTINEL: u64 = u64::MAX;

    pub fn new() -> Self {
        Self { transmitted: 0, received: 0, min_time: Self::MIN_TIME_SENTINEL, max_time: 0, total_time: 0 }
    }

    pub fn transmitted(&self) -> u64 {
        self.transmitted
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn max_time(&self) -> u64 {
        self.max_time
    }

    pub fn record_transmitted(&mut self) {
        self.transmitted += 1;
    }

    pub fn record_reply(&mut self, round_trip_ms: Option<u64>) {
        self.received += 1;
        if let Some(time) = round_trip_ms {
            self.total_time = self.total_time.saturating_add(time);
            self.min_time = self.min_time.min(time);
            self.max_time = self.max_time.max(time);
        }
    }

    /// Loss is truncated to a whole percent and the average is truncated to a whole
    /// millisecond.
    pub fn summarize(&self) -> Summary {
        let loss_percent = if self.transmitted == 0 {
            0
        } else {
            self.transmitted.saturating_sub(self.received) * 100 / self.transmitted
        };
        let round_trip = (self.received > 0 && self.min_time != Self::MIN_TIME_SENTINEL).then(|| RoundTrip {
            min: self.min_time,
            avg: self.total_time / self.received,
            max: self.max_time,
        });
        Summary { transmitted: self.transmitted, received: self.received, loss_percent, round_trip }
    }
}
