//! spgen Core - streaming lexer engine (pure logic, no terminal output)
//!
//! Contains the rule-table vocabulary, the grammar definition parser and the
//! scanning engine that dispatches tokens to a listener.
//!
//! Configuration is passed explicitly via parameters, not via global state.

pub mod grammar;
pub mod kit;

// Re-export common types
pub use grammar::{GrammarDefinition, Pattern, RuleSet, RuleSetBuilder};
pub use kit::lexer::{
    BuildError, LexError, LexErrorKind, LexerContext, LexerProcessor, LexerProcessorBuilder,
    ScanStats, SourceError, SourcePosition, SourceSpan, TokenCollector, TokenInfo, TokenListener,
    VisitAction,
};

// Re-export config types from spgen-config
pub use spgen_config::{LexerConfig, Phase, RecoveryPolicy};
