use std::time::{Instant, SystemTime};

/// Time source of a session: monotonic time for deadlines, wall-clock time for the timestamps
/// embedded in echo requests.
pub trait Clock {
    fn now(&self) -> Instant;
    fn wall_time(&self) -> SystemTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_time(&self) -> SystemTime {
        SystemTime::now()
    }
}
