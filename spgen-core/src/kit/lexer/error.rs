//! Lexer 错误类型
//!
//! - `SourceError`: 源文件打开/读取失败
//! - `BuildError`: 构建 `LexerProcessor` 失败
//! - `LexError`: 扫描期间的错误，包含错误类型、位置和被丢弃的文本

use std::io;
use std::path::Path;

use thiserror::Error;

use super::core::SourcePosition;

/// 源读取错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Source file not found: {path}")]
    NotFound { path: String },

    #[error("Cannot read source '{path}': {message}")]
    IoFailure { path: String, message: String },
}

impl SourceError {
    /// 从 io::Error 转换，`NotFound` 单独归类
    pub fn from_io(path: &Path, err: &io::Error) -> Self {
        let path = path.to_string_lossy().to_string();
        if err.kind() == io::ErrorKind::NotFound {
            SourceError::NotFound { path }
        } else {
            SourceError::IoFailure {
                path,
                message: err.to_string(),
            }
        }
    }
}

/// 构建错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("No source configured: call source_file() or source_text() before build()")]
    NoSourceConfigured,

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// 错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// 当前模式下没有任何规则能以该字符开头
    UnrecognizedSymbol(char),
    /// 输入在 token 未闭合时结束（如未终止的字符串/注释）
    UnterminatedToken,
    /// 规则尝试弹出最底层的模式
    ModeStackUnderflow,
    /// 扫描过程中读取源失败
    Source(SourceError),
}

/// 词法错误，包含结构化信息
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{}:{}] {}", .position.line, .position.column, .message)]
pub struct LexError {
    /// 错误类型
    pub kind: LexErrorKind,
    /// 错误发生的位置（出错 token 的起始位置）
    pub position: SourcePosition,
    /// 出错的文本；Skip 恢复策略下即被丢弃的输入
    pub lexeme: String,
    /// 详细错误消息
    pub message: String,
}

impl LexError {
    /// 在指定位置创建错误
    pub fn at(kind: LexErrorKind, position: SourcePosition, lexeme: impl Into<String>) -> Self {
        let message = Self::format_message(&kind);
        Self {
            kind,
            position,
            lexeme: lexeme.into(),
            message,
        }
    }

    /// 获取行号（1-based）
    pub fn line(&self) -> usize {
        self.position.line
    }

    /// 获取列号（1-based）
    pub fn column(&self) -> usize {
        self.position.column
    }

    fn format_message(kind: &LexErrorKind) -> String {
        match kind {
            LexErrorKind::UnrecognizedSymbol(ch) => format!("Unrecognized symbol {:?}", ch),
            LexErrorKind::UnterminatedToken => "Unterminated token at end of input".to_string(),
            LexErrorKind::ModeStackUnderflow => "Cannot pop the default lexer mode".to_string(),
            LexErrorKind::Source(e) => e.to_string(),
        }
    }
}

impl From<SourceError> for LexErrorKind {
    fn from(e: SourceError) -> Self {
        LexErrorKind::Source(e)
    }
}
