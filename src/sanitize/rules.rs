//! Individual cleanup rules applied by the sanitizer.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::context::STAGED_FILES_PLACEHOLDER;
use crate::protocol::{END_DELIMITER, START_DELIMITER};
use crate::sanitize::emoji::strip_emoji_line;

const FENCE: &str = "```";

/// `type(scope)!: description`, with the same scope shape the contract's
/// subject format accepts.
static SUBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+(\([^()\s]+\))?!?: \S").expect("Invalid regex"));

/// Openers models put in front of the message they were asked for.
const CONVERSATIONAL_OPENERS: &[&str] = &[
    "here's",
    "here is",
    "here are",
    "sure",
    "certainly",
    "okay",
    "ok,",
    "of course",
    "absolutely",
    "great",
    "based on",
    "i've",
    "i have",
    "i'll",
    "i will",
    "below is",
    "the following",
    "this commit message",
    "commit message",
];

/// Replace the staged-files placeholder with the rendered table.
pub fn substitute_table(text: &str, table: &str) -> String {
    text.replace(STAGED_FILES_PLACEHOLDER, table)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Fence,
    Subject,
    Conversational,
    Content,
}

/// Classify a line by what remains of it after the later cleanup rules, so
/// that rerunning the preamble rule on cleaned output finds the same lines.
fn classify(line: &str) -> LineKind {
    let without_emoji = strip_emoji_line(line);
    if without_emoji.trim_start().starts_with(FENCE) {
        return LineKind::Fence;
    }

    let normalized = remove_markers(&without_emoji);
    let normalized = normalized.trim();
    if normalized.is_empty() {
        LineKind::Blank
    } else if SUBJECT_RE.is_match(normalized) {
        LineKind::Subject
    } else if is_conversational(normalized) {
        LineKind::Conversational
    } else {
        LineKind::Content
    }
}

fn is_conversational(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.ends_with(':')
        || CONVERSATIONAL_OPENERS
            .iter()
            .any(|opener| lower.starts_with(opener))
}

/// Whether `line` reads as a conventional commit subject.
pub fn is_subject_line(line: &str) -> bool {
    classify(line) == LineKind::Subject
}

/// Drop everything the model wrote before the message itself.
///
/// With a subject line present, every line above the first one goes. Without
/// one, leading blank, fence and conversational lines go.
pub fn strip_preamble(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let kinds: Vec<LineKind> = lines.iter().map(|l| classify(l)).collect();

    let start = match kinds.iter().position(|k| *k == LineKind::Subject) {
        Some(subject) => subject,
        None => kinds
            .iter()
            .position(|k| *k == LineKind::Content)
            .unwrap_or(lines.len()),
    };

    lines[start..].join("\n")
}

/// Remove emoji from every line.
pub fn strip_emoji(text: &str) -> String {
    crate::sanitize::emoji::strip_emoji(text)
}

/// Remove markdown fence lines and any leftover triple backticks, keeping the
/// text the fences enclosed.
pub fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with(FENCE))
        .map(remove_stray_fences)
        .collect::<Vec<_>>()
        .join("\n")
}

fn remove_stray_fences(line: &str) -> String {
    let mut out = line.to_string();
    while out.contains(FENCE) {
        out = out.replace(FENCE, "");
    }
    out
}

/// Remove the protocol delimiters wherever the model echoed them. A line left
/// empty by the removal is dropped.
pub fn strip_delimiters(text: &str) -> String {
    text.lines()
        .filter_map(|line| {
            if !contains_marker(line) {
                return Some(line.to_string());
            }
            let cleaned = remove_markers(line);
            (!cleaned.trim().is_empty()).then_some(cleaned)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn contains_marker(line: &str) -> bool {
    line.contains(FENCE) || line.contains(START_DELIMITER) || line.contains(END_DELIMITER)
}

/// Remove fences and delimiters until none are left; removing one can join
/// the pieces of another.
fn remove_markers(line: &str) -> String {
    let mut out = line.to_string();
    while contains_marker(&out) {
        out = out
            .replace(START_DELIMITER, "")
            .replace(END_DELIMITER, "")
            .replace(FENCE, "");
    }
    out
}

/// Trim the message and the end of every line.
pub fn trim_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
