//! Sample line decoding.
//!
//! One record per line: `timestamp_ms,raw_code,lead_off[,...]`. Extra
//! trailing fields are ignored. Parsing is total: malformed input yields
//! `None` and never affects subsequent lines.

use crate::core::Sample;

/// Lines starting with this marker are metadata or comments.
pub const COMMENT_MARKER: char = '#';

const FIELD_SEPARATOR: char = ',';

/// Decode a single line into a [`Sample`], or `None` if the line is blank,
/// a comment, or malformed.
pub fn parse_line(line: &str) -> Option<Sample> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(COMMENT_MARKER) {
        return None;
    }

    let mut fields = line.split(FIELD_SEPARATOR);
    let t_ms = fields.next()?.trim().parse::<i64>().ok()?;
    let raw = fields.next()?.trim().parse::<u32>().ok()?;
    let lead_off = fields.next()?.trim().parse::<i64>().ok()? != 0;

    Some(Sample {
        t_ms,
        raw,
        lead_off,
    })
}
