use std::time::Duration;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Fit `raw` into `max_width` terminal columns, ending with `...` when it had to be cut.
pub(crate) fn truncate_with_ellipsis(raw: &str, max_width: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.width() <= max_width {
        return trimmed.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }

    let budget = max_width - 3;
    let mut used = 0;
    let mut head = String::new();
    for c in trimmed.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        head.push(c);
    }
    format!("{head}...")
}

/// Short elapsed-time label: `850ms`, `4.2s`, `3m05s`.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        let secs = elapsed.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}

/// Gauge ratio for `done` out of `total`; an empty set counts as complete.
pub(crate) fn ratio(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (done as f64 / total as f64).clamp(0.0, 1.0)
}
