//! Per-run statistics and the end-of-session summary.
//!
//! The protocol engine reports a [`RunStats`] for every completed run; the
//! binary accumulates them into a [`TransferSummary`] and prints the report
//! after teardown.  Nothing here feeds back into the protocol — timing is
//! observational only.

use std::fmt;
use std::time::Duration;

/// Outcome of one completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Payload bytes moved in the run.
    pub bytes: u64,
    /// DATA/LAST_SEGMENT packets exchanged.
    pub segments: u32,
    /// Wall-clock duration from first segment to run completion.
    pub elapsed: Duration,
}

impl RunStats {
    /// Throughput in megabits per second, or 0 for a zero-length interval.
    pub fn megabits_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        (self.bytes as f64 * 8.0) / (secs * 1_000_000.0)
    }
}

/// Accumulated statistics across all runs of one session.
#[derive(Debug, Default)]
pub struct TransferSummary {
    runs: Vec<RunStats>,
}

impl TransferSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed run.
    pub fn record(&mut self, stats: RunStats) {
        self.runs.push(stats);
    }

    /// Number of recorded runs.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Total payload bytes across all runs.
    pub fn total_bytes(&self) -> u64 {
        self.runs.iter().map(|r| r.bytes).sum()
    }

    /// Total wall-clock transfer time across all runs.
    pub fn total_elapsed(&self) -> Duration {
        self.runs.iter().map(|r| r.elapsed).sum()
    }

    /// Mean per-run duration, or zero when no runs were recorded.
    pub fn average_elapsed(&self) -> Duration {
        if self.runs.is_empty() {
            return Duration::ZERO;
        }
        self.total_elapsed() / self.runs.len() as u32
    }

    /// Overall throughput in megabits per second.
    pub fn average_megabits_per_second(&self) -> f64 {
        let secs = self.total_elapsed().as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        (self.total_bytes() as f64 * 8.0) / (secs * 1_000_000.0)
    }
}

impl fmt::Display for TransferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--------------------------------------------")?;
        writeln!(f, "Detailed run statistics:")?;
        for (i, run) in self.runs.iter().enumerate() {
            writeln!(
                f,
                "Run #{}:\t time: {:.3} ms; speed: {:.3} Mbps",
                i + 1,
                run.elapsed.as_secs_f64() * 1000.0,
                run.megabits_per_second()
            )?;
        }
        writeln!(f, "--------------------------------------------")?;
        writeln!(f, "Overall summary:")?;
        writeln!(f, "Runs completed: {}", self.run_count())?;
        writeln!(
            f,
            "Total data: {:.3} MB",
            self.total_bytes() as f64 / (1024.0 * 1024.0)
        )?;
        writeln!(
            f,
            "Average run time: {:.3} ms",
            self.average_elapsed().as_secs_f64() * 1000.0
        )?;
        writeln!(
            f,
            "Average throughput: {:.3} Mbps",
            self.average_megabits_per_second()
        )?;
        writeln!(
            f,
            "Total time: {:.3} ms",
            self.total_elapsed().as_secs_f64() * 1000.0
        )?;
        write!(f, "--------------------------------------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_math() {
        let stats = RunStats {
            bytes: 1_000_000,
            segments: 685,
            elapsed: Duration::from_secs(1),
        };
        assert!((stats.megabits_per_second() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn zero_elapsed_yields_zero_throughput() {
        let stats = RunStats {
            bytes: 1,
            segments: 1,
            elapsed: Duration::ZERO,
        };
        assert_eq!(stats.megabits_per_second(), 0.0);
    }

    #[test]
    fn summary_accumulates_runs() {
        let mut summary = TransferSummary::new();
        summary.record(RunStats {
            bytes: 5000,
            segments: 4,
            elapsed: Duration::from_millis(10),
        });
        summary.record(RunStats {
            bytes: 3000,
            segments: 3,
            elapsed: Duration::from_millis(30),
        });

        assert_eq!(summary.run_count(), 2);
        assert_eq!(summary.total_bytes(), 8000);
        assert_eq!(summary.total_elapsed(), Duration::from_millis(40));
        assert_eq!(summary.average_elapsed(), Duration::from_millis(20));
    }

    #[test]
    fn empty_summary_renders_without_panicking() {
        let summary = TransferSummary::new();
        assert_eq!(summary.average_elapsed(), Duration::ZERO);
        assert!(summary.to_string().contains("Runs completed: 0"));
    }
}
