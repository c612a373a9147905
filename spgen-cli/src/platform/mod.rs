//! 平台相关的输出

pub mod cli;
