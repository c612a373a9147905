//! 语法定义文件解析
//!
//! ```text
//! // 注释
//! property name = 'value';
//! fragment digit : '\d';
//! token Integer : digit+;
//! skip Whitespace : '\s'+;
//! mode Template;
//! token Close : '}' -> pop;
//! token Open : '{' -> push(Template);
//! ```
//!
//! 规则表达式中既可以引用 fragment，也可以引用已声明的 token/skip 规则。
//! 同名 property 以最后一次为准。

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use super::pattern::{is_ident_continue, is_ident_start, Pattern, PatternError};
use super::rules::{RuleError, RuleSet, RuleSetBuilder};

/// 语法定义错误，行列号均为 1-based
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Unknown token at line: {line}, column {column}")]
    UnknownToken { line: usize, column: usize },

    #[error("Expected {expected} at line: {line}, column {column}")]
    Expected {
        expected: &'static str,
        line: usize,
        column: usize,
    },

    #[error("Unterminated string at line: {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },

    #[error("Invalid pattern at line: {line}, column {column}: {source}")]
    Pattern {
        line: usize,
        column: usize,
        #[source]
        source: PatternError,
    },

    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error("Cannot read grammar '{path}': {message}")]
    Io { path: String, message: String },
}

impl DefinitionError {
    /// 出错位置 (line, column)
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            DefinitionError::UnknownToken { line, column }
            | DefinitionError::Expected { line, column, .. }
            | DefinitionError::UnterminatedString { line, column }
            | DefinitionError::Pattern { line, column, .. } => Some((*line, *column)),
            DefinitionError::Rules(_) | DefinitionError::Io { .. } => None,
        }
    }
}

/// 解析后的语法定义
#[derive(Debug, Clone)]
pub struct GrammarDefinition {
    properties: BTreeMap<String, String>,
    rules: RuleSet<String>,
}

impl GrammarDefinition {
    /// 解析语法定义文本
    pub fn parse(text: &str) -> Result<Self, DefinitionError> {
        let statements = DefinitionParser::new(text).parse_statements()?;

        let mut properties = BTreeMap::new();
        let mut builder = RuleSetBuilder::<String>::new();
        let mut fragment_names = HashSet::new();
        for statement in &statements {
            if let Statement::Fragment { name, .. } = statement {
                fragment_names.insert(name.clone());
            }
        }

        // token 规则同时以自身名称作为可引用的表达式
        let mut aliased = HashSet::new();
        for statement in statements {
            builder = match statement {
                Statement::Property { name, value } => {
                    properties.insert(name, value);
                    builder
                }
                Statement::Fragment { name, pattern } => builder.fragment(name, pattern),
                Statement::Mode { name } => builder.mode(name),
                Statement::Rule {
                    name,
                    pattern,
                    skip,
                    action,
                } => {
                    if !fragment_names.contains(&name) && aliased.insert(name.clone()) {
                        builder = builder.fragment(name.clone(), pattern.clone());
                    }
                    builder = if skip {
                        builder.skip(name, pattern)
                    } else {
                        builder.token(name, pattern)
                    };
                    match action {
                        Some(Action::Push(mode)) => builder.push_mode(mode),
                        Some(Action::Pop) => builder.pop_mode(),
                        None => builder,
                    }
                }
            };
        }

        let rules = builder.build()?;
        debug!(
            target: "spgen::grammar",
            properties = properties.len(),
            rules = rules.rules().len(),
            modes = rules.modes().len(),
            "Parsed grammar definition"
        );
        Ok(Self { properties, rules })
    }

    /// 读取并解析语法定义文件
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DefinitionError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(target: "spgen::grammar", path = %path.display(), "Loading grammar definition");
        Self::parse(&text)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn rules(&self) -> &RuleSet<String> {
        &self.rules
    }

    pub fn into_rules(self) -> RuleSet<String> {
        self.rules
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Push(String),
    Pop,
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Property {
        name: String,
        value: String,
    },
    Fragment {
        name: String,
        pattern: Pattern,
    },
    Rule {
        name: String,
        pattern: Pattern,
        skip: bool,
        action: Option<Action>,
    },
    Mode {
        name: String,
    },
}

struct DefinitionParser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl DefinitionParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// 空白和 `//` 行注释
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn expected(&self, expected: &'static str) -> DefinitionError {
        DefinitionError::Expected {
            expected,
            line: self.line,
            column: self.column,
        }
    }

    fn parse_statements(&mut self) -> Result<Vec<Statement>, DefinitionError> {
        let mut statements = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek().is_none() {
                return Ok(statements);
            }
            let (line, column) = (self.line, self.column);
            let keyword = self.parse_identifier();
            let statement = match keyword.as_deref() {
                Some("property") => self.parse_property()?,
                Some("fragment") => {
                    let (name, pattern) = self.parse_rule_head()?;
                    self.expect(';', "';'")?;
                    Statement::Fragment { name, pattern }
                }
                Some(keyword @ ("token" | "skip")) => {
                    let skip = keyword == "skip";
                    let (name, pattern) = self.parse_rule_head()?;
                    let action = self.parse_action()?;
                    self.expect(';', "';'")?;
                    Statement::Rule {
                        name,
                        pattern,
                        skip,
                        action,
                    }
                }
                Some("mode") => {
                    let name = self.expect_identifier()?;
                    self.expect(';', "';'")?;
                    Statement::Mode { name }
                }
                _ => return Err(DefinitionError::UnknownToken { line, column }),
            };
            statements.push(statement);
        }
    }

    fn parse_identifier(&mut self) -> Option<String> {
        self.skip_trivia();
        match self.peek() {
            Some(c) if is_ident_start(c) => {}
            _ => return None,
        }
        let mut ident = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_continue(*c)) {
            ident.push(c);
            self.bump();
        }
        Some(ident)
    }

    fn expect_identifier(&mut self) -> Result<String, DefinitionError> {
        self.skip_trivia();
        let err = self.expected("identifier");
        self.parse_identifier().ok_or(err)
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<(), DefinitionError> {
        self.skip_trivia();
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            Err(self.expected(expected))
        }
    }

    fn parse_property(&mut self) -> Result<Statement, DefinitionError> {
        let name = self.expect_identifier()?;
        self.expect('=', "'='")?;
        let value = self.parse_string()?;
        self.expect(';', "';'")?;
        Ok(Statement::Property { name, value })
    }

    /// `'...'` 字符串值，支持 `\'` `\\` `\n` `\t` `\r`
    fn parse_string(&mut self) -> Result<String, DefinitionError> {
        self.skip_trivia();
        let (line, column) = (self.line, self.column);
        if self.peek() != Some('\'') {
            return Err(self.expected("string"));
        }
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(DefinitionError::UnterminatedString { line, column }),
                Some('\'') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(c) => value.push(c),
                    None => return Err(DefinitionError::UnterminatedString { line, column }),
                },
                Some(c) => value.push(c),
            }
        }
    }

    /// `name : pattern`，表达式在 `;` 或 `->` 处结束
    fn parse_rule_head(&mut self) -> Result<(String, Pattern), DefinitionError> {
        let name = self.expect_identifier()?;
        self.expect(':', "':'")?;
        self.skip_trivia();
        let (line, column) = (self.line, self.column);
        let body_start = self.pos;

        let mut in_literal = false;
        let mut in_set = false;
        loop {
            match self.peek() {
                None => {
                    return Err(if in_literal {
                        DefinitionError::UnterminatedString { line, column }
                    } else {
                        self.expected("';'")
                    })
                }
                Some('\\') if in_literal || in_set => {
                    self.bump();
                }
                Some('\'') if !in_set => in_literal = !in_literal,
                Some('[') if !in_literal => in_set = true,
                Some(']') if !in_literal => in_set = false,
                Some(';') if !in_literal && !in_set => break,
                Some('-') if !in_literal && !in_set && self.peek_at(1) == Some('>') => break,
                _ => {}
            }
            self.bump();
        }

        let body: String = self.chars[body_start..self.pos].iter().collect();
        let pattern = Pattern::parse(&body).map_err(|source| {
            let (line, column) = match source.offset() {
                Some(offset) => advance_location(&self.chars[body_start..], offset, line, column),
                None => (line, column),
            };
            DefinitionError::Pattern {
                line,
                column,
                source,
            }
        })?;
        Ok((name, pattern))
    }

    /// `-> pop` 或 `-> push(Mode)`
    fn parse_action(&mut self) -> Result<Option<Action>, DefinitionError> {
        self.skip_trivia();
        if !(self.peek() == Some('-') && self.peek_at(1) == Some('>')) {
            return Ok(None);
        }
        self.bump();
        self.bump();
        let (line, column) = (self.line, self.column);
        match self.parse_identifier().as_deref() {
            Some("pop") => Ok(Some(Action::Pop)),
            Some("push") => {
                self.expect('(', "'('")?;
                let mode = self.expect_identifier()?;
                self.expect(')', "')'")?;
                Ok(Some(Action::Push(mode)))
            }
            _ => Err(DefinitionError::Expected {
                expected: "'push(Mode)' or 'pop'",
                line,
                column,
            }),
        }
    }
}

/// 把表达式内的字符偏移换算为文件中的行列号
fn advance_location(chars: &[char], offset: usize, line: usize, column: usize) -> (usize, usize) {
    chars
        .iter()
        .take(offset)
        .fold((line, column), |(line, column), &c| {
            if c == '\n' {
                (line + 1, 1)
            } else {
                (line, column + 1)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::pattern::CharClass;
    use crate::grammar::rules::ModeAction;

    fn statements(text: &str) -> Result<Vec<Statement>, DefinitionError> {
        DefinitionParser::new(text).parse_statements()
    }

    #[test]
    fn test_property_statement() {
        assert_eq!(
            statements("property abc = 'value';").unwrap(),
            vec![Statement::Property {
                name: "abc".to_string(),
                value: "value".to_string()
            }]
        );
        assert_eq!(
            statements("property abcds23 = '';").unwrap(),
            vec![Statement::Property {
                name: "abcds23".to_string(),
                value: String::new()
            }]
        );
    }

    #[test]
    fn test_malformed_properties() {
        assert!(statements("prop abcds23 = '';").is_err());
        assert!(statements("property abcds23 = ;").is_err());
        assert!(statements("property abcds23 = 'asd'").is_err());
        assert!(statements("property abcds23 = asd;").is_err());
        assert!(statements("property = asd;").is_err());
        assert!(statements("=;").is_err());
    }

    #[test]
    fn test_token_statement_with_references() {
        let parsed = statements("token rule : anotherRule zeroOrMany* ;").unwrap();
        assert_eq!(
            parsed,
            vec![Statement::Rule {
                name: "rule".to_string(),
                pattern: Pattern::seq([
                    Pattern::fragment("anotherRule"),
                    Pattern::fragment("zeroOrMany").zero_or_more(),
                ]),
                skip: false,
                action: None,
            }]
        );
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(statements("token var : a (;").is_err());
        assert!(statements("token var : *;").is_err());
        assert!(statements("token 4 : a (;").is_err());
        assert!(statements("token : a (;").is_err());
        assert!(statements("tvar : a (;").is_err());
        assert!(statements("token var : ;").is_err());
        assert!(statements("token var ;").is_err());
        assert!(statements(";").is_err());
    }

    #[test]
    fn test_empty_and_comment_only() {
        assert!(statements("").unwrap().is_empty());
        assert!(statements("   \n\r  \t ").unwrap().is_empty());
        assert!(statements("// only a comment").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_token_location() {
        let err = statements("property a = 'b';\n  @").unwrap_err();
        assert_eq!(err, DefinitionError::UnknownToken { line: 2, column: 3 });
        assert_eq!(err.to_string(), "Unknown token at line: 2, column 3");
    }

    #[test]
    fn test_pattern_error_location() {
        let err = statements("token t :\n  'a' '\\q';").unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::Pattern {
                line: 2,
                column: 8,
                source: PatternError::UnknownEscape { ch: 'q', .. }
            }
        ));
    }

    #[test]
    fn test_semicolon_inside_literal_and_set() {
        let parsed = statements("token Semi : ';' [;]? ;").unwrap();
        assert!(matches!(parsed[0], Statement::Rule { ref pattern, .. }
            if *pattern == Pattern::seq([
                Pattern::literal(";"),
                Pattern::class(CharClass::Set { items: vec![CharClass::Char(';')], negated: false })
                    .optional(),
            ])));
    }

    #[test]
    fn test_parse_full_definition() {
        let text = r"
            // demo grammar
            property name = 'demo';
            fragment digit : '\d';
            token Integer : digit+;
            token Open : '{' -> push(Inner);
            skip Whitespace : '\s'+;
            mode Inner;
            token Word : [a-z]+;
            token Close : '}' -> pop;
        ";
        let def = GrammarDefinition::parse(text).unwrap();
        assert_eq!(def.property("name"), Some("demo"));

        let rules = def.rules();
        assert_eq!(rules.rules().len(), 5);
        let inner = rules.mode_id("Inner").unwrap();
        assert_eq!(rules.rules()[1].action, Some(ModeAction::Push(inner)));
        assert_eq!(rules.rules()[4].action, Some(ModeAction::Pop));
        assert!(rules.rules()[2].skip);
        assert_eq!(rules.rules()[3].kind, "Word");
    }

    #[test]
    fn test_tokens_can_reference_tokens() {
        let def = GrammarDefinition::parse(
            "token anotherRule : 'a'; token zeroOrMany : 'b'; token rule : anotherRule zeroOrMany* ;",
        )
        .unwrap();
        assert_eq!(def.rules().rules().len(), 3);
    }

    #[test]
    fn test_last_property_wins() {
        let def = GrammarDefinition::parse("property a = '1'; property a = '2'; token T : 't';")
            .unwrap();
        assert_eq!(def.property("a"), Some("2"));
    }

    #[test]
    fn test_undefined_reference_is_rule_error() {
        let err = GrammarDefinition::parse("token rule : missing;").unwrap_err();
        assert_eq!(
            err,
            DefinitionError::Rules(RuleError::UndefinedFragment("missing".to_string()))
        );
    }

    #[test]
    fn test_bad_action() {
        let err = statements("token T : 't' -> jump;").unwrap_err();
        assert!(matches!(err, DefinitionError::Expected { .. }));
    }
}
