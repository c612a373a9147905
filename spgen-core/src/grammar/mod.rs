//! 规则表：表达式、规则集、语法定义文件

pub mod definition;
pub mod pattern;
pub mod rules;
pub mod test01;

pub use definition::{DefinitionError, GrammarDefinition};
pub use pattern::{CharClass, Pattern, PatternError};
pub use rules::{
    IntoPattern, LexerMode, ModeAction, Rule, RuleError, RuleSet, RuleSetBuilder, DEFAULT_MODE,
};
pub use test01::{Test01Token, TEST01_GRAMMAR};
