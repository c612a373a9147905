//! 测试辅助工具
//!
//! 提供端到端测试的规则表和扫描辅助函数

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use spgen_core::grammar::test01::{self, Test01Token};
use spgen_core::{
    LexError, LexerConfig, LexerProcessor, RuleSet, ScanStats, TokenCollector, TokenInfo,
};

/// Test01 规则表
pub fn test01_rules() -> Arc<RuleSet<Test01Token>> {
    Arc::new(test01::rules().expect("Test01 rules must build"))
}

/// 带字符串字面量的规则表，用于未终止 token 测试
pub fn string_rules() -> Arc<RuleSet<&'static str>> {
    Arc::new(
        RuleSet::builder()
            .token("Identifier", "[a-zA-Z_][a-zA-Z0-9_]*")
            .token("String", r#"'"' [^"]* '"'"#)
            .skip("Whitespace", r"'\s'+")
            .build()
            .expect("string rules must build"),
    )
}

/// 以空白分隔的任意字符单词
pub fn word_rules() -> Arc<RuleSet<&'static str>> {
    Arc::new(
        RuleSet::builder()
            .token("Word", r"[^ \t\r\n]+")
            .skip("Space", r"'\s'+")
            .build()
            .expect("word rules must build"),
    )
}

/// 扫描文本，返回 (kind, lexeme) 列表
pub fn lex_text<K: Clone>(rules: Arc<RuleSet<K>>, text: &str) -> Result<Vec<(K, String)>, LexError> {
    let mut collector = TokenCollector::new();
    LexerProcessor::builder(rules)
        .source_text(text)
        .build()
        .expect("text source always builds")
        .process(&mut collector)?;
    Ok(pairs(collector.into_tokens()))
}

/// 扫描文本并保留 skip/错误文本
pub fn collect_all<K: Clone>(
    rules: Arc<RuleSet<K>>,
    text: &str,
    config: LexerConfig,
) -> (TokenCollector<K>, Result<ScanStats, LexError>) {
    let mut collector = TokenCollector::with_skipped();
    let result = LexerProcessor::builder(rules)
        .source_text(text)
        .config(config)
        .build()
        .expect("text source always builds")
        .process(&mut collector);
    (collector, result)
}

pub fn pairs<K>(tokens: Vec<TokenInfo<K>>) -> Vec<(K, String)> {
    tokens.into_iter().map(|t| (t.kind, t.lexeme)).collect()
}

/// 写入临时文件
pub fn temp_file(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}
