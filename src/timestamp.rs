//! Time-of-day codec for strace timestamps
//!
//! strace's `-t`/`-tt` options print wall-clock time of day only
//! (`HH:MM:SS.ffffff`, no date), so every timestamp is interpreted as a
//! millisecond offset within a single calendar day. Traces spanning more than
//! one day produce garbage by construction; that limitation is inherited from
//! the log format and is not compensated for here.

use crate::error::{Result, TraceError};

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Decode a `HH:MM:SS.ffffff` time-of-day string into milliseconds since
/// midnight.
///
/// ```
/// assert_eq!(buildtrace::timestamp::decode("16:09:18.502932").unwrap(), 58_158_502);
/// ```
pub fn decode(text: &str) -> Result<i64> {
    let malformed = || TraceError::MalformedTimestamp {
        text: text.to_string(),
    };

    let (clock, micros) = text.split_once('.').ok_or_else(malformed)?;

    let mut fields = clock.split(':');
    let mut next_field = || -> Result<i64> {
        fields
            .next()
            .and_then(|f| f.parse::<i64>().ok())
            .ok_or_else(malformed)
    };
    let hours = next_field()?;
    let minutes = next_field()?;
    let seconds = next_field()?;
    if fields.next().is_some() {
        return Err(malformed());
    }

    // Fixed six-digit microsecond field; anything else would silently change
    // the scale of the fractional part.
    if micros.len() != 6 {
        return Err(malformed());
    }
    let micros: i64 = micros.parse().map_err(|_| malformed())?;

    Ok(micros / 1000 + hours * MS_PER_HOUR + minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND)
}

/// Format milliseconds since midnight back into `HH:MM:SS.ffffff`.
///
/// `decode(&encode(ms)) == ms` for any value within one day. Used for
/// diagnostics and round-trip tests.
pub fn encode(ms: i64) -> String {
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let micros = (ms % MS_PER_SECOND) * 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
}
