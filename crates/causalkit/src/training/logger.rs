//! Training progress logging.
//!
//! Messages go to stderr and are filtered by [`Verbosity`].

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// How much the trainer reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Only warnings.
    Warning,
    /// Start/finish summaries.
    Info,
    /// Per-tree details.
    Debug,
}

impl Verbosity {
    /// Map a numeric level (0..=3) to a verbosity.
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(Self::Silent),
            1 => Some(Self::Warning),
            2 => Some(Self::Info),
            3 => Some(Self::Debug),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" | "quiet" | "0" => Ok(Self::Silent),
            "warning" | "warn" | "1" => Ok(Self::Warning),
            "info" | "2" => Ok(Self::Info),
            "debug" | "3" => Ok(Self::Debug),
            other => Err(format!("unknown verbosity '{other}'")),
        }
    }
}

/// Logger for forest training.
///
/// Shared by reference across worker threads; per-tree messages are single
/// `eprintln!` calls so lines never interleave mid-message.
#[derive(Debug)]
pub struct TrainingLogger {
    verbosity: Verbosity,
    started: Option<Instant>,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            started: None,
        }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    pub fn enabled(&self, level: Verbosity) -> bool {
        level != Verbosity::Silent && self.verbosity >= level
    }

    pub fn start_training(&mut self, n_trees: usize, n_rows: usize, n_features: usize, n_arms: usize) {
        self.started = Some(Instant::now());
        if self.enabled(Verbosity::Info) {
            eprintln!(
                "[causalkit] training {n_trees} trees on {n_rows} rows, {n_features} features, {n_arms} arms"
            );
        }
    }

    pub fn log_tree(&self, index: usize, n_nodes: usize, n_leaves: usize, depth: usize) {
        if self.enabled(Verbosity::Debug) {
            eprintln!(
                "[causalkit] tree {index}: {n_nodes} nodes, {n_leaves} leaves, depth {depth}"
            );
        }
    }

    pub fn finish_training(&self, n_trees: usize) {
        if self.enabled(Verbosity::Info) {
            let elapsed = self.started.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0);
            eprintln!("[causalkit] finished {n_trees} trees in {elapsed:.3}s");
        }
    }

    pub fn warn(&self, message: impl fmt::Display) {
        if self.enabled(Verbosity::Warning) {
            eprintln!("[causalkit] warning: {message}");
        }
    }

    pub fn info(&self, message: impl fmt::Display) {
        if self.enabled(Verbosity::Info) {
            eprintln!("[causalkit] {message}");
        }
    }

    pub fn debug(&self, message: impl fmt::Display) {
        if self.enabled(Verbosity::Debug) {
            eprintln!("[causalkit] {message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_ordering() {
        assert!(Verbosity::Debug > Verbosity::Info);
        assert!(Verbosity::Info > Verbosity::Warning);
        assert!(Verbosity::Warning > Verbosity::Silent);
    }

    #[test]
    fn verbosity_parse() {
        assert_eq!("INFO".parse::<Verbosity>(), Ok(Verbosity::Info));
        assert_eq!("3".parse::<Verbosity>(), Ok(Verbosity::Debug));
        assert!("loud".parse::<Verbosity>().is_err());
        assert_eq!(Verbosity::from_level(1), Some(Verbosity::Warning));
        assert_eq!(Verbosity::from_level(7), None);
    }

    #[test]
    fn silent_logger_enables_nothing() {
        let logger = TrainingLogger::new(Verbosity::Silent);
        assert!(!logger.enabled(Verbosity::Warning));
        assert!(!logger.enabled(Verbosity::Silent));

        let logger = TrainingLogger::new(Verbosity::Info);
        assert!(logger.enabled(Verbosity::Warning));
        assert!(!logger.enabled(Verbosity::Debug));
    }
}
