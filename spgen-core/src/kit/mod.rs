//! 通用工具

pub mod lexer;
