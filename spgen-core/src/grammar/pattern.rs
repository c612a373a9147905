//! 规则表达式
//!
//! 记法：
//! - 并列表示顺序，`|` 表示选择，后缀 `* + ?`（前面可以有空白），`( )` 分组
//! - `'...'` 字面量，支持 `\t \n \r \' \\` 转义和 `\. \d \D \w \W \s` 字符类
//! - `[...]` 字符集合，支持区间 `a-z` 和 `^` 取反
//! - 裸标识符引用 fragment

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// 单个字符的匹配条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharClass {
    /// `\.` 任意字符
    Any,
    /// `\d`
    Digit,
    /// `\D`
    NonDigit,
    /// `\w` ASCII 字母
    Letter,
    /// `\W`
    NonLetter,
    /// `\s`
    Whitespace,
    Char(char),
    /// 闭区间
    Range(char, char),
    Set {
        items: Vec<CharClass>,
        negated: bool,
    },
}

impl CharClass {
    pub fn matches(&self, c: char) -> bool {
        match self {
            CharClass::Any => true,
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::NonDigit => !c.is_ascii_digit(),
            CharClass::Letter => c.is_ascii_alphabetic(),
            CharClass::NonLetter => !c.is_ascii_alphabetic(),
            CharClass::Whitespace => c.is_whitespace(),
            CharClass::Char(expected) => c == *expected,
            CharClass::Range(from, to) => (*from..=*to).contains(&c),
            CharClass::Set { items, negated } => items.iter().any(|item| item.matches(c)) != *negated,
        }
    }

    /// 字面量中的转义：`\t` 等返回字符本身，`\d` 等返回字符类
    fn from_escape(c: char) -> Option<CharClass> {
        let class = match c {
            't' => CharClass::Char('\t'),
            'n' => CharClass::Char('\n'),
            'r' => CharClass::Char('\r'),
            '\'' | '\\' => CharClass::Char(c),
            '.' => CharClass::Any,
            'd' => CharClass::Digit,
            'D' => CharClass::NonDigit,
            'w' => CharClass::Letter,
            'W' => CharClass::NonLetter,
            's' => CharClass::Whitespace,
            _ => return None,
        };
        Some(class)
    }
}

/// 规则表达式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Literal(String),
    Class(CharClass),
    Sequence(Vec<Pattern>),
    Choice(Vec<Pattern>),
    ZeroOrMore(Box<Pattern>),
    OneOrMore(Box<Pattern>),
    Optional(Box<Pattern>),
    /// 引用具名 fragment
    Fragment(String),
}

impl Pattern {
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    pub fn class(class: CharClass) -> Self {
        Pattern::Class(class)
    }

    pub fn range(from: char, to: char) -> Self {
        Pattern::Class(CharClass::Range(from, to))
    }

    pub fn seq(items: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::Sequence(items.into_iter().collect())
    }

    pub fn choice(items: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::Choice(items.into_iter().collect())
    }

    pub fn fragment(name: impl Into<String>) -> Self {
        Pattern::Fragment(name.into())
    }

    pub fn zero_or_more(self) -> Self {
        Pattern::ZeroOrMore(Box::new(self))
    }

    pub fn one_or_more(self) -> Self {
        Pattern::OneOrMore(Box::new(self))
    }

    pub fn optional(self) -> Self {
        Pattern::Optional(Box::new(self))
    }

    /// 解析表达式记法
    pub fn parse(source: &str) -> Result<Pattern, PatternError> {
        let mut parser = PatternParser {
            chars: source.chars().collect(),
            pos: 0,
        };
        parser.skip_whitespace();
        if parser.at_end() {
            return Err(PatternError::Empty);
        }
        let pattern = parser.parse_choice()?;
        parser.skip_whitespace();
        match parser.peek() {
            None => Ok(pattern),
            Some(ch) => Err(PatternError::UnexpectedChar {
                ch,
                offset: parser.pos,
            }),
        }
    }

    /// 按出现顺序收集引用的 fragment 名称
    pub fn fragment_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Pattern::Fragment(name) => out.push(name),
            Pattern::Sequence(items) | Pattern::Choice(items) => {
                for item in items {
                    item.collect_refs(out);
                }
            }
            Pattern::ZeroOrMore(inner) | Pattern::OneOrMore(inner) | Pattern::Optional(inner) => {
                inner.collect_refs(out)
            }
            Pattern::Literal(_) | Pattern::Class(_) => {}
        }
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharClass::Any => write!(f, "'\\.'"),
            CharClass::Digit => write!(f, "'\\d'"),
            CharClass::NonDigit => write!(f, "'\\D'"),
            CharClass::Letter => write!(f, "'\\w'"),
            CharClass::NonLetter => write!(f, "'\\W'"),
            CharClass::Whitespace => write!(f, "'\\s'"),
            CharClass::Char(c) => write!(f, "{:?}", c),
            CharClass::Range(a, b) => write!(f, "[{}-{}]", a.escape_debug(), b.escape_debug()),
            CharClass::Set { items, negated } => {
                write!(f, "[{}", if *negated { "^" } else { "" })?;
                for item in items {
                    write!(f, " {}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(s) => write!(f, "'{}'", s.escape_debug()),
            Pattern::Class(c) => write!(f, "{}", c),
            Pattern::Sequence(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Pattern::Choice(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Pattern::ZeroOrMore(inner) => write!(f, "{}*", inner),
            Pattern::OneOrMore(inner) => write!(f, "{}+", inner),
            Pattern::Optional(inner) => write!(f, "{}?", inner),
            Pattern::Fragment(name) => write!(f, "{}", name),
        }
    }
}

/// 表达式解析错误，offset 为字符下标
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Empty pattern")]
    Empty,

    #[error("Unexpected end of pattern")]
    UnexpectedEnd,

    #[error("Unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Unknown escape '\\{ch}' at offset {offset}")]
    UnknownEscape { ch: char, offset: usize },

    #[error("Unterminated literal starting at offset {offset}")]
    UnterminatedLiteral { offset: usize },

    #[error("Empty literal at offset {offset}")]
    EmptyLiteral { offset: usize },

    #[error("Unterminated character set starting at offset {offset}")]
    UnterminatedSet { offset: usize },

    #[error("Empty character set at offset {offset}")]
    EmptySet { offset: usize },

    #[error("Invalid range {from:?}-{to:?}")]
    InvalidRange { from: char, to: char },
}

impl PatternError {
    /// 错误所在的字符下标
    pub fn offset(&self) -> Option<usize> {
        match self {
            PatternError::UnexpectedChar { offset, .. }
            | PatternError::UnknownEscape { offset, .. }
            | PatternError::UnterminatedLiteral { offset }
            | PatternError::EmptyLiteral { offset }
            | PatternError::UnterminatedSet { offset }
            | PatternError::EmptySet { offset } => Some(*offset),
            _ => None,
        }
    }
}

struct PatternParser {
    chars: Vec<char>,
    pos: usize,
}

impl PatternParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_choice(&mut self) -> Result<Pattern, PatternError> {
        let mut alternatives = vec![self.parse_sequence()?];
        loop {
            self.skip_whitespace();
            if self.peek() != Some('|') {
                break;
            }
            self.pos += 1;
            alternatives.push(self.parse_sequence()?);
        }
        Ok(single_or(alternatives, Pattern::Choice))
    }

    fn parse_sequence(&mut self) -> Result<Pattern, PatternError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some('|') | Some(')') => break,
                Some(_) => items.push(self.parse_postfix()?),
            }
        }
        if items.is_empty() {
            return match self.peek() {
                None => Err(PatternError::UnexpectedEnd),
                Some(ch) => Err(PatternError::UnexpectedChar {
                    ch,
                    offset: self.pos,
                }),
            };
        }
        Ok(single_or(items, Pattern::Sequence))
    }

    fn parse_postfix(&mut self) -> Result<Pattern, PatternError> {
        let mut pattern = self.parse_atom()?;
        loop {
            self.skip_whitespace();
            pattern = match self.peek() {
                Some('*') => pattern.zero_or_more(),
                Some('+') => pattern.one_or_more(),
                Some('?') => pattern.optional(),
                _ => break,
            };
            self.pos += 1;
        }
        Ok(pattern)
    }

    fn parse_atom(&mut self) -> Result<Pattern, PatternError> {
        let start = self.pos;
        match self.peek() {
            Some('\'') => self.parse_literal(),
            Some('[') => self.parse_set().map(Pattern::Class),
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_choice()?;
                self.skip_whitespace();
                match self.bump() {
                    Some(')') => Ok(inner),
                    Some(ch) => Err(PatternError::UnexpectedChar { ch, offset: start }),
                    None => Err(PatternError::UnexpectedEnd),
                }
            }
            Some(c) if is_ident_start(c) => {
                while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
                    self.pos += 1;
                }
                let name: String = self.chars[start..self.pos].iter().collect();
                Ok(Pattern::Fragment(name))
            }
            Some(ch) => Err(PatternError::UnexpectedChar { ch, offset: start }),
            None => Err(PatternError::UnexpectedEnd),
        }
    }

    /// `'...'`，其中的字符类转义把字面量切成顺序
    fn parse_literal(&mut self) -> Result<Pattern, PatternError> {
        let start = self.pos;
        self.pos += 1;
        let mut parts = Vec::new();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(PatternError::UnterminatedLiteral { offset: start }),
                Some('\'') => break,
                Some('\\') => {
                    let offset = self.pos - 1;
                    let ch = self
                        .bump()
                        .ok_or(PatternError::UnterminatedLiteral { offset: start })?;
                    match CharClass::from_escape(ch) {
                        Some(CharClass::Char(c)) => text.push(c),
                        Some(class) => {
                            if !text.is_empty() {
                                parts.push(Pattern::Literal(std::mem::take(&mut text)));
                            }
                            parts.push(Pattern::Class(class));
                        }
                        None => return Err(PatternError::UnknownEscape { ch, offset }),
                    }
                }
                Some(c) => text.push(c),
            }
        }
        if !text.is_empty() {
            parts.push(Pattern::Literal(text));
        }
        if parts.is_empty() {
            return Err(PatternError::EmptyLiteral { offset: start });
        }
        Ok(single_or(parts, Pattern::Sequence))
    }

    fn parse_set(&mut self) -> Result<CharClass, PatternError> {
        let start = self.pos;
        self.pos += 1;
        let negated = self.peek() == Some('^');
        if negated {
            self.pos += 1;
        }
        let mut items = Vec::new();
        loop {
            let item = match self.bump() {
                None => return Err(PatternError::UnterminatedSet { offset: start }),
                Some(']') => break,
                Some('\\') => self.parse_set_escape(start)?,
                Some(c) => CharClass::Char(c),
            };
            // 区间 a-z（末尾的 '-' 按普通字符处理）
            if let CharClass::Char(from) = item {
                if self.peek() == Some('-') && !matches!(self.chars.get(self.pos + 1), Some(']') | None) {
                    self.pos += 1;
                    let to = match self.bump() {
                        Some('\\') => match self.parse_set_escape(start)? {
                            CharClass::Char(c) => c,
                            _ => return Err(PatternError::InvalidRange { from, to: '\\' }),
                        },
                        Some(c) => c,
                        None => return Err(PatternError::UnterminatedSet { offset: start }),
                    };
                    if to < from {
                        return Err(PatternError::InvalidRange { from, to });
                    }
                    items.push(CharClass::Range(from, to));
                    continue;
                }
            }
            items.push(item);
        }
        if items.is_empty() {
            return Err(PatternError::EmptySet { offset: start });
        }
        Ok(CharClass::Set { items, negated })
    }

    fn parse_set_escape(&mut self, set_start: usize) -> Result<CharClass, PatternError> {
        let offset = self.pos - 1;
        let ch = self
            .bump()
            .ok_or(PatternError::UnterminatedSet { offset: set_start })?;
        match ch {
            ']' | '[' | '-' | '^' => Ok(CharClass::Char(ch)),
            _ => CharClass::from_escape(ch).ok_or(PatternError::UnknownEscape { ch, offset }),
        }
    }
}

fn single_or(mut items: Vec<Pattern>, wrap: fn(Vec<Pattern>) -> Pattern) -> Pattern {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
