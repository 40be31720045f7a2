//! Parses stored progress-file lines back into stream events.
//!
//! The watcher replays a file's history through the same event vocabulary a
//! live run publishes, so dashboard clients render historical and live
//! sessions identically.

use crate::broadcast::signal_display_name;
use ralphex_proto::{Signal, StreamEvent};

/// Parses one stored line into zero or more events.
///
/// Section banners become `section` events; the footer's `Completed:` line
/// additionally yields `done`; any embedded signal marker is republished
/// alongside the line. Blank lines produce nothing.
pub fn parse_line(line: &str) -> Vec<StreamEvent> {
    if line.trim().is_empty() {
        return Vec::new();
    }

    if let Some(label) = line.strip_prefix("--- ").and_then(|rest| rest.strip_suffix(" ---")) {
        return vec![StreamEvent::Section { label: label.to_string() }];
    }

    let text = strip_timestamp(line).to_string();
    let mut events = Vec::new();

    if line.starts_with("Completed: ") {
        events.push(StreamEvent::Line { text });
        events.push(StreamEvent::Done);
        return events;
    }

    events.push(StreamEvent::Line { text });
    match Signal::scan(line) {
        None | Some(Signal::Question(_)) => {}
        Some(signal) => events.push(StreamEvent::Signal {
            name: signal_display_name(&signal).to_string(),
        }),
    }
    events
}

/// Strips the `[yy-mm-dd HH:MM:SS] ` prefix when present.
fn strip_timestamp(line: &str) -> &str {
    // "[xx-xx-xx xx:xx:xx] " is exactly 20 bytes
    let bytes = line.as_bytes();
    if bytes.len() < 20 || bytes[0] != b'[' || bytes[18] != b']' || bytes[19] != b' ' {
        return line;
    }
    let well_formed = bytes[1..18]
        .iter()
        .all(|b| b.is_ascii_digit() || *b == b'-' || *b == b':' || *b == b' ');
    if well_formed {
        // the checked prefix is all ASCII, so byte 20 is a char boundary
        &line[20..]
    } else {
        line
    }
}
