//! Monitoring plugin status codes and threshold ranges.
//!
//! Ranges follow the plugin guidelines: `[@][start:][end]`. `start` defaults
//! to 0, `~` stands for negative infinity and a missing `end` for positive
//! infinity. A value outside `start..=end` raises an alert, or a value inside
//! it when the range starts with `@`.

use std::fmt;
use std::process;
use std::str::FromStr;

use crate::error::CheckError;

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    pub fn exit(self) -> ! {
        process::exit(self.code())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    start: f64,
    end: f64,
    inside: bool,
    text: String,
}

impl Range {
    pub fn alerts(&self, value: f64) -> bool {
        let within = self.start <= value && value <= self.end;
        within == self.inside
    }
}

impl FromStr for Range {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || CheckError::InvalidRange(s.to_string());

        let (inside, body) = match text.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (start, end) = body.split_once(':').unwrap_or(("", body));

        let start = match start {
            "" => 0.0,
            "~" => f64::NEG_INFINITY,
            n => n.parse::<f64>().map_err(|_| invalid())?,
        };
        let end = match end {
            "" => f64::INFINITY,
            n => n.parse::<f64>().map_err(|_| invalid())?,
        };
        if start.is_nan() || end.is_nan() || start > end {
            return Err(invalid());
        }

        Ok(Range {
            start,
            end,
            inside,
            text: text.to_string(),
        })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Warning and critical ranges for one metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thresholds {
    pub warning: Option<Range>,
    pub critical: Option<Range>,
}

impl Thresholds {
    pub fn new(warning: Option<Range>, critical: Option<Range>) -> Self {
        Self { warning, critical }
    }

    pub fn evaluate(&self, value: f64) -> Status {
        if self.critical.as_ref().is_some_and(|r| r.alerts(value)) {
            Status::Critical
        } else if self.warning.as_ref().is_some_and(|r| r.alerts(value)) {
            Status::Warning
        } else {
            Status::Ok
        }
    }

    /// The range responsible for `status`, if any.
    pub fn breached(&self, status: Status) -> Option<&Range> {
        match status {
            Status::Critical => self.critical.as_ref(),
            Status::Warning => self.warning.as_ref(),
            _ => None,
        }
    }
}
