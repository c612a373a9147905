//! spgen 流式词法分析器
//!
//! - 规则表驱动：引擎不关心具体语法，由 `RuleSet` 参数化
//! - 流式：文件按块读取，token 逐个同步交给 listener
//! - 精准位置追踪：每个 token 带起止位置

pub mod builder;
pub mod context;
pub mod core;
pub mod error;
pub mod listener;
pub mod processor;
pub mod state_machine;
pub mod token;

pub use builder::{LexerProcessorBuilder, SourceSpec};
pub use context::{LexerContext, ModeId};
pub use self::core::{SourceBuffer, SourcePosition, SourceSpan};
pub use error::{BuildError, LexError, LexErrorKind, SourceError};
pub use listener::{TokenCollector, TokenListener, VisitAction};
pub use processor::{LexerProcessor, ScanStats};
pub use token::TokenInfo;
