//! 词法分析底层设施：位置追踪与字符源

pub mod position;
pub mod source_buffer;

pub use position::{SourcePosition, SourceSpan};
pub use source_buffer::SourceBuffer;
