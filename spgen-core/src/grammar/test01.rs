//! Test01 演示规则表
//!
//! 标识符、整数、四个比较/赋值运算符，空白被跳过。

use std::fmt;

use serde::Serialize;

use super::pattern::{CharClass, Pattern};
use super::rules::{RuleError, RuleSet};

/// Test01 的 token 种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Test01Token {
    Identifier,
    Integer,
    Operator,
    Whitespace,
}

impl fmt::Display for Test01Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Test01Token::Identifier => "Identifier",
            Test01Token::Integer => "Integer",
            Test01Token::Operator => "Operator",
            Test01Token::Whitespace => "Whitespace",
        };
        f.write_str(name)
    }
}

/// 同一张规则表的语法定义形式
pub const TEST01_GRAMMAR: &str = r"// Test01
property namespace = 'Test01';

fragment letter : [a-zA-Z_];
fragment digit : '\d';

token Identifier : letter (letter | digit)*;
token Integer : digit+;
token Operator : '==' | '!=' | '!' | '=';
skip Whitespace : '\s'+;
";

/// 构建 Test01 规则表
pub fn rules() -> Result<RuleSet<Test01Token>, RuleError> {
    let letter = Pattern::class(CharClass::Set {
        items: vec![
            CharClass::Range('a', 'z'),
            CharClass::Range('A', 'Z'),
            CharClass::Char('_'),
        ],
        negated: false,
    });

    RuleSet::builder()
        .fragment("letter", letter)
        .fragment("digit", Pattern::class(CharClass::Digit))
        .token(
            Test01Token::Identifier,
            Pattern::seq([
                Pattern::fragment("letter"),
                Pattern::choice([Pattern::fragment("letter"), Pattern::fragment("digit")])
                    .zero_or_more(),
            ]),
        )
        .token(Test01Token::Integer, Pattern::fragment("digit").one_or_more())
        .token(
            Test01Token::Operator,
            Pattern::choice(["==", "!=", "!", "="].map(Pattern::literal)),
        )
        .skip(
            Test01Token::Whitespace,
            Pattern::class(CharClass::Whitespace).one_or_more(),
        )
        .build()
}
