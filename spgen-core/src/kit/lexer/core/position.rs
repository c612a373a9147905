//! 源代码位置追踪
//!
//! - line/column: 人类可读的错误显示（1-based）
//! - offset: UTF-8 字节偏移（0-based），用于文件跳转和切片

use serde::Serialize;
use std::fmt;

/// 源代码位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourcePosition {
    /// 字节偏移，0-based，UTF-8编码
    pub offset: usize,
    /// 行号，1-based
    pub line: usize,
    /// 列号，1-based，Unicode码点计数
    pub column: usize,
}

impl SourcePosition {
    /// 创建新位置
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// 文件起始位置
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// 前进一个字符
    ///
    /// `\n` 换行并把列号重置为 1，其余字符（包括 `\r`、`\t`）列号加 1。
    pub fn advance(&mut self, c: char) {
        self.advance_by(c, c.len_utf8());
    }

    /// 前进一个在源中占 `bytes` 个字节的字符
    ///
    /// 非法 UTF-8 解码出的 U+FFFD 在文件中的字节数与 `len_utf8` 不同。
    pub fn advance_by(&mut self, c: char, bytes: usize) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.offset += bytes;
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// 源代码区间（Span），end 为开区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    /// 从起始位置创建空区间（结束位置相同）
    pub fn at(pos: SourcePosition) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// 合并两个位置为区间
    pub fn range(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    /// 区间覆盖的字节数
    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_start() {
        let pos = SourcePosition::start();
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 1);
        assert_eq!(pos.offset, 0);
    }

    #[test]
    fn test_position_advance_ascii() {
        let mut pos = SourcePosition::start();

        pos.advance('a');
        assert_eq!(pos.column, 2);
        assert_eq!(pos.offset, 1);

        pos.advance('b');
        assert_eq!(pos.column, 3);
        assert_eq!(pos.offset, 2);
    }

    #[test]
    fn test_position_advance_newline() {
        let mut pos = SourcePosition::start();

        pos.advance('a');
        pos.advance('\n');

        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 1);
        assert_eq!(pos.offset, 2);
    }

    #[test]
    fn test_position_advance_tab_and_cr_are_columns() {
        let mut pos = SourcePosition::start();
        pos.advance('\t');
        pos.advance('\r');
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 3);
    }

    #[test]
    fn test_position_advance_cjk() {
        let mut pos = SourcePosition::start();

        // CJK字符：3字节UTF-8，1列
        pos.advance('中');
        assert_eq!(pos.column, 2);
        assert_eq!(pos.offset, 3);
    }

    #[test]
    fn test_position_advance_by_source_bytes() {
        let mut pos = SourcePosition::start();
        pos.advance_by('\u{FFFD}', 1);
        assert_eq!((pos.offset, pos.column), (1, 2));
    }

    #[test]
    fn test_span_len_and_display() {
        let start = SourcePosition::new(4, 1, 5);
        let end = SourcePosition::new(6, 1, 7);
        let span = SourceSpan::range(start, end);
        assert_eq!(span.len(), 2);
        assert!(!span.is_empty());
        assert!(SourceSpan::at(start).is_empty());
        assert_eq!(span.to_string(), "1:5-1:7");
    }
}
