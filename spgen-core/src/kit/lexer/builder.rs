//! LexerProcessor 构建器
//!
//! 输入源二选一：文件或内存文本。多次设置时以最后一次为准。
//! `build` 消费构建器，文件在构建时打开。

use std::path::PathBuf;
use std::sync::Arc;

use spgen_config::LexerConfig;
use tracing::debug;

use super::core::SourceBuffer;
use super::error::BuildError;
use super::processor::LexerProcessor;
use crate::grammar::rules::RuleSet;

/// 输入源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    File(PathBuf),
    Text(String),
}

/// LexerProcessor 构建器
pub struct LexerProcessorBuilder<K> {
    rules: Arc<RuleSet<K>>,
    source: Option<SourceSpec>,
    config: LexerConfig,
}

impl<K: Clone> LexerProcessorBuilder<K> {
    pub fn new(rules: Arc<RuleSet<K>>) -> Self {
        Self {
            rules,
            source: None,
            config: LexerConfig::default(),
        }
    }

    /// 从文件读取
    pub fn source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(SourceSpec::File(path.into()));
        self
    }

    /// 从内存文本读取
    pub fn source_text(mut self, text: impl Into<String>) -> Self {
        self.source = Some(SourceSpec::Text(text.into()));
        self
    }

    pub fn config(mut self, config: LexerConfig) -> Self {
        self.config = config;
        self
    }

    /// 当前设置的输入源
    pub fn source(&self) -> Option<&SourceSpec> {
        self.source.as_ref()
    }

    pub fn build(self) -> Result<LexerProcessor<K>, BuildError> {
        let source = match self.source {
            None => return Err(BuildError::NoSourceConfigured),
            Some(SourceSpec::Text(text)) => {
                debug!(target: "spgen::source", chars = text.chars().count(), "Using in-memory source");
                SourceBuffer::from_text(text)
            }
            Some(SourceSpec::File(path)) => {
                SourceBuffer::from_file_with_chunk_size(&path, self.config.read_chunk_size)?
            }
        };
        Ok(LexerProcessor::new(source, self.rules, self.config))
    }
}
