//! CLI 错误类型

use spgen_core::grammar::{DefinitionError, RuleError};
use spgen_core::{BuildError, LexError};
use thiserror::Error;

/// spgen-lex 运行失败的原因
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Cannot load config '{path}': {message}")]
    Config { path: String, message: String },

    #[error("Cannot read '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("Cannot initialize logging: {0}")]
    Logging(String),

    /// 语法定义错误，附带定义文件的文本用于显示上下文
    #[error("{path}: {error}")]
    Grammar {
        path: String,
        error: DefinitionError,
        text: String,
    },

    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// 扫描错误，`text` 为输入文本（文件无法再次读取时为 None）
    #[error("{name}: {error}")]
    Lex {
        name: String,
        error: LexError,
        text: Option<String>,
    },

    #[error("Cannot write output: {0}")]
    Output(String),
}

impl CliError {
    /// 可显示上下文的错误位置：(源文本, 行, 列)
    pub fn source_context(&self) -> Option<(&str, usize, usize)> {
        match self {
            CliError::Grammar { error, text, .. } => error
                .location()
                .map(|(line, column)| (text.as_str(), line, column)),
            CliError::Lex {
                error,
                text: Some(text),
                ..
            } => Some((text.as_str(), error.line(), error.column())),
            _ => None,
        }
    }
}
