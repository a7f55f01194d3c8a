//! Context block construction for commit-message generation.

use crate::context::{ChangeContext, StagedFile};
use crate::error::ContextError;

/// Token the model writes where the staged-files table belongs.
pub const STAGED_FILES_PLACEHOLDER: &str = "{{STAGED_FILES_TABLE}}";

/// Maximum length for sanitized diff text.
const MAX_DIFF_SANITIZED_LENGTH: usize = 30_000;

/// Render the staged-files table as markdown.
pub fn render_table(files: &[StagedFile]) -> String {
    let mut table = String::from("| File | Modules |\n|------|---------|");
    for file in files {
        table.push_str(&format!(
            "\n| {} | {} |",
            escape_cell(&file.path),
            escape_cell(&file.modules_label())
        ));
    }
    table
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Build the context block handed to the generation backend.
///
/// Contains the staged-files table, the cleaned diff in a fenced block and
/// the fixed instructions. Fails with `NoStagedFiles` when there is nothing
/// to describe.
pub fn assemble_context(ctx: &ChangeContext) -> Result<String, ContextError> {
    if ctx.is_empty() {
        return Err(ContextError::NoStagedFiles);
    }

    let table = render_table(&ctx.staged_files);
    let (diff, truncated) = sanitize_diff(&ctx.diff_text, MAX_DIFF_SANITIZED_LENGTH);
    let fence = fence_for(&diff);

    let truncation_note = if truncated {
        "\n\nNote: The diff was truncated due to size. Focus on the visible changes."
    } else {
        ""
    };

    let module_count = ctx.affected_modules().len();

    Ok(format!(
        r#"You are writing the Git commit message for the staged changes below.

## Staged Files ({file_count} files, {module_count} modules)
{table}

## Staged Diff
{fence}diff
{diff}
{fence}{truncation_note}

## How to use this material
- The table tells you which module owns each staged file. `NONE` means no module owns it.
- Group the change by module. For each affected module, quote a small number of
  representative code lines from the diff (5 to 15 lines per module) that show
  the essence of the change. Do NOT reproduce the whole diff.
- Indent quoted code lines by four spaces. Do NOT use markdown code fences.
- Where the staged-files table belongs in the body, write the token
  {placeholder} on its own line. It is replaced with the table above; do not
  copy the table yourself.

## Message format
- First line: `type(scope): description`, at most 72 characters (aim for 50).
- Type: one of feat, fix, build, chore, ci, docs, style, refactor, perf, test.
- Description: imperative mood, lowercase after the colon, no trailing period.
- Second line: blank. Then the body explaining WHY the change was made.
- Wrap prose at 72 characters.
- No emoji, no markdown headings, no code fences.

## Output
Respond with ONLY the commit message. No greeting, no explanation, no
closing remarks."#,
        file_count = ctx.staged_files.len(),
        placeholder = STAGED_FILES_PLACEHOLDER,
    ))
}

/// A backtick fence longer than any backtick run inside `text`.
fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

/// Sanitize diff text for inclusion in the context block.
///
/// Removes control characters (except newlines and tabs) and ANSI escape
/// sequences, then truncates on a char boundary. Returns the cleaned text and
/// whether it was truncated.
pub fn sanitize_diff(text: &str, max_len: usize) -> (String, bool) {
    let mut result = remove_ansi_escapes(text);
    result = remove_control_chars(&result);

    let truncated = result.len() > max_len;
    if truncated {
        let mut end = max_len;
        while end > 0 && !result.is_char_boundary(end) {
            end -= 1;
        }
        result.truncate(end);
    }

    (result, truncated)
}

fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Strip CSI escape sequences (`ESC [ ... final-byte`).
fn remove_ansi_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for next in chars.by_ref() {
                if ('@'..='~').contains(&next) {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(files: Vec<StagedFile>, diff: &str) -> ChangeContext {
        ChangeContext::new(files, diff)
    }

    #[test]
    fn test_assemble_rejects_empty_context() {
        let result = assemble_context(&ctx(Vec::new(), "+x\n"));
        assert!(matches!(result, Err(ContextError::NoStagedFiles)));
    }

    #[test]
    fn test_table_renders_multi_module_row() {
        let table = render_table(&[StagedFile::new("src/cli/help.md", ["cli", "docs"])]);
        assert!(table.contains("| src/cli/help.md | cli, docs |"));
    }

    #[test]
    fn test_table_renders_unowned_row() {
        let table = render_table(&[StagedFile::new("LICENSE", Vec::<String>::new())]);
        assert!(table.contains("| LICENSE | NONE |"));
    }

    #[test]
    fn test_table_escapes_pipes() {
        let table = render_table(&[StagedFile::new("odd|name.txt", ["core"])]);
        assert!(table.contains("odd\\|name.txt"));
    }

    #[test]
    fn test_assemble_includes_table_diff_and_instructions() {
        let block = assemble_context(&ctx(
            vec![StagedFile::new("src/lib.rs", ["core"])],
            "+pub fn new_function() {}\n",
        ))
        .unwrap();

        assert!(block.contains("| src/lib.rs | core |"));
        assert!(block.contains("```diff\n+pub fn new_function() {}"));
        assert!(block.contains("5 to 15 lines per module"));
        assert!(block.contains(STAGED_FILES_PLACEHOLDER));
        assert!(block.contains("1 files, 1 modules"));
    }

    #[test]
    fn test_fence_outgrows_backticks_in_diff() {
        let block = assemble_context(&ctx(
            vec![StagedFile::new("README.md", ["docs"])],
            "+```rust\n+let x = 1;\n+```\n",
        ))
        .unwrap();
        assert!(block.contains("````diff"));
    }

    #[test]
    fn test_assemble_truncation_note() {
        let diff = "+a\n".repeat(20_000);
        let block = assemble_context(&ctx(vec![StagedFile::new("big.rs", ["core"])], &diff))
            .unwrap();
        assert!(block.contains("truncated due to size"));
    }

    #[test]
    fn test_sanitize_diff_removes_ansi() {
        let text = "\x1b[31m-old line\x1b[0m\n\x1b[32m+new line\x1b[0m\n";
        let (sanitized, truncated) = sanitize_diff(text, 1000);
        assert!(!truncated);
        assert!(!sanitized.contains('\x1b'));
        assert!(sanitized.contains("-old line"));
        assert!(sanitized.contains("+new line"));
    }

    #[test]
    fn test_sanitize_diff_keeps_tabs_and_newlines() {
        let (sanitized, _) = sanitize_diff("+\tindented\u{0007}\n", 1000);
        assert_eq!(sanitized, "+\tindented\n");
    }

    #[test]
    fn test_sanitize_diff_truncates_on_char_boundary() {
        let text = "é".repeat(20);
        let (sanitized, truncated) = sanitize_diff(&text, 7);
        assert!(truncated);
        assert_eq!(sanitized, "ééé");
    }
}
