//! CLI 格式化输出
//!
//! 提供命令行友好的错误显示和源码上下文打印。

use std::fmt::Write;

use crate::error::CliError;

/// 错误行前后显示的上下文行数
const CONTEXT_LINES: usize = 2;

/// 打印错误并显示源代码上下文
pub fn print_error_with_source(e: &CliError) {
    eprintln!("error: {}", e);

    if let Some((source, line, column)) = e.source_context() {
        eprint!("{}", format_source_context(source, line, column));
    }
}

/// 格式化源代码上下文（错误行前后几行 + 指向错误列的标记）
///
/// 行号越界时返回空字符串。列号按字符计。
pub fn format_source_context(source: &str, error_line: usize, error_col: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let total_lines = lines.len();
    let mut out = String::new();

    if error_line == 0 || error_line > total_lines {
        return out;
    }

    let start_line = error_line.saturating_sub(CONTEXT_LINES).max(1);
    let end_line = (error_line + CONTEXT_LINES).min(total_lines);
    let width = end_line.to_string().len();
    let separator = "-".repeat(width + 1);

    let _ = writeln!(out, "{}|--", separator);
    for (line_idx, content) in (start_line..=end_line).zip(&lines[start_line - 1..end_line]) {
        let _ = writeln!(out, "{:>width$} | {}", line_idx, content, width = width);
        if line_idx == error_line {
            // 制表符原样保留，标记才能和源码对齐
            let marker: String = content
                .chars()
                .take(error_col.saturating_sub(1))
                .map(|c| if c == '\t' { '\t' } else { ' ' })
                .collect();
            let _ = writeln!(out, "{} | {}^", " ".repeat(width), marker);
        }
    }
    let _ = writeln!(out, "{}|--", separator);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_points_at_column() {
        let out = format_source_context("a = 1\nb = $\nc = 3", 2, 5);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec!["--|--", "1 | a = 1", "2 | b = $", "  |     ^", "3 | c = 3", "--|--"]
        );
    }

    #[test]
    fn test_context_is_clipped() {
        let source = (1..=10).map(|i| format!("line{}", i)).collect::<Vec<_>>().join("\n");
        let out = format_source_context(&source, 10, 1);
        assert!(out.contains(" 8 | line8"));
        assert!(!out.contains("line7"));
        assert!(out.contains("10 | line10\n   | ^"));
    }

    #[test]
    fn test_out_of_range_line() {
        assert_eq!(format_source_context("abc", 0, 1), "");
        assert_eq!(format_source_context("abc", 2, 1), "");
    }

    #[test]
    fn test_multibyte_column() {
        let out = format_source_context("中文 $", 1, 4);
        assert!(out.contains("  |    ^"));
    }
}
