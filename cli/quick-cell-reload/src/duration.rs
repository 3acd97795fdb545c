//! Duration flag parsing.

use std::time::Duration;

/// Parse a duration with an optional unit suffix (ms, s, m, h).
///
/// A bare number is taken as seconds. Fractions are allowed: `1.5s`, `0.5h`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("missing duration".to_string());
    }

    // "ms" must be checked before "s" and "m".
    let (num_str, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 0.001)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1.0)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60.0)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3600.0)
    } else {
        (s, 1.0)
    };

    let value = num_str
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid duration '{}'", s))?;

    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid duration '{}'", s));
    }

    Duration::try_from_secs_f64(value * multiplier)
        .map_err(|_| format!("duration '{}' is out of range", s))
}
