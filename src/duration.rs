// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Timeout parsing and formatting.
//!
//! Configuration files written for other Relewise integrations use the
//! `[-][d.]hh:mm[:ss[.fffffff]]` time-span notation, so that is accepted next to
//! humantime strings (`10s`, `1m 30s`) and plain numbers of seconds.

use crate::error::ConfigError;
use std::time::Duration;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Parses a timeout written as a time span, a humantime string or seconds.
///
/// Negative values are rejected; zero is returned as-is and left for
/// [`ClientOptions::new`](crate::options::ClientOptions::new) to reject.
pub fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
  let trimmed = value.trim();
  let (negative, unsigned) = match trimmed.strip_prefix('-') {
    Some(rest) => (true, rest.trim_start()),
    None => (false, trimmed),
  };

  let invalid = || ConfigError::InvalidTimeout {
    value: value.to_string(),
  };

  let duration = if unsigned.contains(':') {
    parse_time_span(unsigned).ok_or_else(invalid)?
  } else if let Ok(seconds) = unsigned.parse::<f64>() {
    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())?
  } else {
    humantime::parse_duration(unsigned).map_err(|_| invalid())?
  };

  if negative && !duration.is_zero() {
    return Err(ConfigError::NonPositiveTimeout {
      value: value.to_string(),
    });
  }

  Ok(duration)
}

/// Parses a timeout given as a number of seconds.
pub fn timeout_from_secs(seconds: f64) -> Result<Duration, ConfigError> {
  if seconds < 0.0 {
    return Err(ConfigError::NonPositiveTimeout {
      value: seconds.to_string(),
    });
  }

  Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidTimeout {
    value: seconds.to_string(),
  })
}

// [d.]hh:mm[:ss[.fffffff]]
fn parse_time_span(value: &str) -> Option<Duration> {
  let parts: Vec<&str> = value.split(':').collect();
  let (head, minutes, seconds) = match parts.as_slice() {
    [head, minutes] => (*head, *minutes, "0"),
    [head, minutes, seconds] => (*head, *minutes, *seconds),
    _ => return None,
  };

  let (days, hours) = match head.split_once('.') {
    Some((days, hours)) => (digits(days)?, digits(hours)?),
    None => (0, digits(head)?),
  };
  let minutes = digits(minutes)?;

  let (seconds, nanos) = match seconds.split_once('.') {
    Some((whole, fraction)) => (digits(whole)?, fraction_nanos(fraction)?),
    None => (digits(seconds)?, 0),
  };

  if hours >= 24 || minutes >= 60 || seconds >= 60 {
    return None;
  }

  let total = days
    .checked_mul(SECONDS_PER_DAY)?
    .checked_add(hours * SECONDS_PER_HOUR)?
    .checked_add(minutes * SECONDS_PER_MINUTE)?
    .checked_add(seconds)?;

  Some(Duration::new(total, nanos))
}

fn digits(value: &str) -> Option<u64> {
  if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  value.parse().ok()
}

fn fraction_nanos(fraction: &str) -> Option<u32> {
  if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  format!("{fraction:0<9}").parse().ok()
}

/// Formats a duration in time-span notation, e.g. `00:00:05` or `1.02:00:00.5000000`.
pub fn format_timeout(duration: Duration) -> String {
  let total = duration.as_secs();
  let days = total / SECONDS_PER_DAY;
  let hours = (total % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
  let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
  let seconds = total % SECONDS_PER_MINUTE;

  let mut formatted = String::new();
  if days > 0 {
    formatted.push_str(&format!("{days}."));
  }
  formatted.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));

  // Ticks are 100ns.
  let ticks = duration.subsec_nanos() / 100;
  if ticks > 0 {
    formatted.push_str(&format!(".{ticks:07}"));
  }

  formatted
}
