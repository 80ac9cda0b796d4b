//! Splits script text into logical lines.
//!
//! `--` starts a comment running to the end of the line. A `\` joins the
//! line with the next one; whatever follows the backslash is dropped.

/// A logical line and the 1-based number of the physical line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub text: String,
}

pub fn strip_comment(line: &str) -> &str {
    line.split_once("--").map_or(line, |(code, _)| code)
}

pub fn logical_lines(src: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut pending: Option<Line> = None;
    for (i, raw) in src.lines().enumerate() {
        let code = strip_comment(raw);
        let (code, continues) = match code.split_once('\\') {
            Some((before, _)) => (before, true),
            None => (code, false),
        };
        let line = pending.get_or_insert_with(|| Line {
            number: i + 1,
            text: String::new(),
        });
        if !line.text.is_empty() {
            line.text.push(' ');
        }
        line.text.push_str(code.trim_end());
        if !continues {
            lines.extend(pending.take());
        }
    }
    lines.extend(pending);
    lines.retain(|l| !l.text.trim().is_empty());
    lines
}
