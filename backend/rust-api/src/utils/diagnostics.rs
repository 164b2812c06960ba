use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Traceback style: "File \"main.py\", line 7, in <module>"
    static ref TRACEBACK_LINE: Regex = Regex::new(r"line (\d+)").unwrap();
    // Compiler style: "main.cpp:5:13: error: ..."
    static ref COMPILER_LINE: Regex = Regex::new(r":(\d+):\d+: error:").unwrap();
    static ref COMPILER_LINE_LOOSE: Regex = Regex::new(r":(\d+):.*error:").unwrap();
}

/// Best-effort extraction of a source line number from free-text
/// compiler/interpreter diagnostics, used only to highlight an editor line.
/// Never influences pass/fail.
///
/// Traceback-style messages yield the *last* "line <n>" occurrence (the most
/// specific frame); compiler-style messages yield the first captured line of
/// `:<line>:<col>: error:`, falling back to the looser `:<line>:.*error:`.
pub fn extract_error_line(message: &str) -> Option<u32> {
    if let Some(caps) = TRACEBACK_LINE.captures_iter(message).last() {
        return caps[1].parse().ok();
    }
    if let Some(caps) = COMPILER_LINE.captures(message) {
        return caps[1].parse().ok();
    }
    COMPILER_LINE_LOOSE
        .captures(message)
        .and_then(|caps| caps[1].parse().ok())
}
