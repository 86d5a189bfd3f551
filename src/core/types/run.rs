use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, EnumIter};

/// Key used for runs without an exit code, shared with the summary file format.
pub const NO_EXIT_KEY: &str = "null";

/// Sentinel written to the status file when a run was killed on timeout.
pub const TIMEOUT_SENTINEL: &str = "None";

/// Exit status of one tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExitStatus {
    /// Process exit code; a child killed by signal `s` is recorded as `-s`
    Code(i32),
    /// Timed out, or the status file was missing or unparsable
    NoExit,
}

impl ExitStatus {
    /// Parse the content of a status file. Anything that is not an integer maps to `NoExit`.
    pub fn parse_lossy(text: &str) -> Self {
        text.trim()
            .parse::<i32>()
            .map(ExitStatus::Code)
            .unwrap_or(ExitStatus::NoExit)
    }

    pub fn kind(&self) -> ExitKind {
        match self {
            ExitStatus::Code(0) => ExitKind::Success,
            ExitStatus::Code(1) => ExitKind::Failure,
            ExitStatus::NoExit => ExitKind::Timeout,
            ExitStatus::Code(-11) => ExitKind::SegmentationFault,
            ExitStatus::Code(-9) => ExitKind::OutOfMemory,
            ExitStatus::Code(-8) => ExitKind::FloatingPointException,
            ExitStatus::Code(_) => ExitKind::OtherCrash,
        }
    }

    /// Text written to the per-run status file
    pub fn to_status_file(&self) -> String {
        match self {
            ExitStatus::Code(code) => code.to_string(),
            ExitStatus::NoExit => TIMEOUT_SENTINEL.to_string(),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Code(code) => write!(f, "{code}"),
            ExitStatus::NoExit => f.write_str(NO_EXIT_KEY),
        }
    }
}

impl FromStr for ExitStatus {
    type Err = String;

    /// Strict parsing used for summary keys: an integer or `null`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == NO_EXIT_KEY {
            return Ok(ExitStatus::NoExit);
        }
        trimmed
            .parse::<i32>()
            .map(ExitStatus::Code)
            .map_err(|_| format!("Invalid exit status key: {trimmed}"))
    }
}

impl Serialize for ExitStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ExitStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExitStatusVisitor;

        impl Visitor<'_> for ExitStatusVisitor {
            type Value = ExitStatus;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer exit code or \"null\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ExitStatus, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ExitStatus, E> {
                i32::try_from(v)
                    .map(ExitStatus::Code)
                    .map_err(|_| E::custom(format!("exit code out of range: {v}")))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ExitStatus, E> {
                i32::try_from(v)
                    .map(ExitStatus::Code)
                    .map_err(|_| E::custom(format!("exit code out of range: {v}")))
            }

            fn visit_unit<E: de::Error>(self) -> Result<ExitStatus, E> {
                Ok(ExitStatus::NoExit)
            }
        }

        deserializer.deserialize_any(ExitStatusVisitor)
    }
}

/// Reporting category of an exit status, in table column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ExitKind {
    Success,
    Failure,
    Timeout,
    #[strum(serialize = "Segmentation fault")]
    SegmentationFault,
    #[strum(serialize = "Out of memory")]
    OutOfMemory,
    #[strum(serialize = "Floating point exception")]
    FloatingPointException,
    #[strum(serialize = "Other crashes")]
    OtherCrash,
}

/// Result of one external test-generation run, read back from its directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub iterations: u64,
    pub coverage: f64,
    pub total_time_ns: u64,
    pub search_time_ns: u64,
    pub mutation_score: f64,
    pub executed_lines: BTreeSet<u32>,
    pub exit_status: ExitStatus,
    pub crash_artifacts: usize,
}

impl RunResult {
    /// Values used for a run that left nothing behind
    pub fn failed(timeout_ns: u64, search_time_ns: u64) -> Self {
        Self {
            iterations: 0,
            coverage: 0.0,
            total_time_ns: timeout_ns,
            search_time_ns,
            mutation_score: 0.0,
            executed_lines: BTreeSet::new(),
            exit_status: ExitStatus::NoExit,
            crash_artifacts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_file_parsing_is_lossy() {
        assert_eq!(ExitStatus::parse_lossy("0\n"), ExitStatus::Code(0));
        assert_eq!(ExitStatus::parse_lossy(" -11 "), ExitStatus::Code(-11));
        assert_eq!(ExitStatus::parse_lossy("None"), ExitStatus::NoExit);
        assert_eq!(ExitStatus::parse_lossy(""), ExitStatus::NoExit);
    }

    #[test]
    fn summary_keys_are_strict() {
        assert_eq!("null".parse::<ExitStatus>(), Ok(ExitStatus::NoExit));
        assert_eq!("-9".parse::<ExitStatus>(), Ok(ExitStatus::Code(-9)));
        assert!("None".parse::<ExitStatus>().is_err());
    }

    #[test]
    fn kinds_follow_signal_convention() {
        assert_eq!(ExitStatus::Code(0).kind(), ExitKind::Success);
        assert_eq!(ExitStatus::Code(1).kind(), ExitKind::Failure);
        assert_eq!(ExitStatus::NoExit.kind(), ExitKind::Timeout);
        assert_eq!(ExitStatus::Code(-11).kind(), ExitKind::SegmentationFault);
        assert_eq!(ExitStatus::Code(-9).kind(), ExitKind::OutOfMemory);
        assert_eq!(ExitStatus::Code(-8).kind(), ExitKind::FloatingPointException);
        assert_eq!(ExitStatus::Code(2).kind(), ExitKind::OtherCrash);
        assert_eq!(ExitKind::OutOfMemory.to_string(), "Out of memory");
    }

    #[test]
    fn timeout_round_trips_through_status_file() {
        let written = ExitStatus::NoExit.to_status_file();
        assert_eq!(written, TIMEOUT_SENTINEL);
        assert_eq!(ExitStatus::parse_lossy(&written), ExitStatus::NoExit);
    }
}
