use crate::statistics::Summary;
use std::fmt;

/// Closing statistics block of a finished session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Report {
    pub target: String,
    pub summary: Summary,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Summary { transmitted, received, loss_percent, round_trip } = self.summary;
        writeln!(f, "--- {} ping statistics ---", self.target)?;
        writeln!(f, "{transmitted} packets transmitted, {received} packets received, {loss_percent}% packet loss")?;
        if let Some(rt) = round_trip {
            writeln!(f, "round-trip min/avg/max = {}/{}/{} ms", rt.min, rt.avg, rt.max)?;
        }
        Ok(())
    }
}
