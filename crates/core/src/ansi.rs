//! ANSI/terminal escape sequence stripping.
//!
//! The patchwork executable colors its output even when asked for plain
//! mode, and captured streams end up in a plain log sink. [`strip_ansi`]
//! removes CSI sequences, OSC sequences (terminal titles, hyperlinks), and
//! single-character escapes before anything is logged.

use std::sync::OnceLock;

use regex::Regex;

/// CSI (`ESC [ ... final`), OSC (`ESC ] ... BEL` or `ESC ] ... ST`), and
/// two-character escapes, in that match order.
const ESCAPE_PATTERN: &str =
    r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]";

static ESCAPE_RE: OnceLock<Regex> = OnceLock::new();

fn escape_re() -> &'static Regex {
    ESCAPE_RE.get_or_init(|| Regex::new(ESCAPE_PATTERN).expect("escape pattern must compile"))
}

/// Remove terminal escape sequences from `input`.
///
/// Text content is preserved byte-for-byte; only the escape sequences
/// themselves are dropped.
pub fn strip_ansi(input: &str) -> String {
    escape_re().replace_all(input, "").into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(strip_ansi("patchflow finished"), "patchflow finished");
    }

    #[test]
    fn strips_color_codes() {
        assert_eq!(
            strip_ansi("\x1b[31merror:\x1b[0m something broke"),
            "error: something broke"
        );
    }

    #[test]
    fn strips_cursor_and_erase_sequences() {
        assert_eq!(strip_ansi("\x1b[2K\x1b[1Gprogress 50%"), "progress 50%");
    }

    #[test]
    fn strips_osc_title_sequence() {
        assert_eq!(strip_ansi("\x1b]0;patchwork\x07done"), "done");
    }

    #[test]
    fn strips_256_color_sequences() {
        assert_eq!(strip_ansi("\x1b[38;5;196mred\x1b[39m"), "red");
    }

    #[test]
    fn preserves_newlines_between_sequences() {
        let input = "\x1b[32mline one\x1b[0m\nline two\n";
        assert_eq!(strip_ansi(input), "line one\nline two\n");
    }

    #[test]
    fn empty_input() {
        assert_eq!(strip_ansi(""), "");
    }
}
