//! CLI 配置
//!
//! 包含 CLI 特有的配置：日志配置，以及可选的 JSON 配置文件（扫描器配置 + 日志级别）

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use spgen_config::{LexerConfig, Phase};
use tracing::Level;

use crate::error::CliError;

/// CLI 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global: Level,
    pub grammar: Option<Level>,
    pub source: Option<Level>,
    pub scanner: Option<Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Level::WARN,
            grammar: None,
            source: None,
            scanner: None,
        }
    }
}

impl LogConfig {
    /// Get log level for a specific phase
    pub fn level_for(&self, phase: Phase) -> Level {
        match phase {
            Phase::Grammar => self.grammar.unwrap_or(self.global),
            Phase::Source => self.source.unwrap_or(self.global),
            Phase::Scanner => self.scanner.unwrap_or(self.global),
            Phase::Cli => self.global,
        }
    }
}

/// 配置文件中的日志部分，级别为字符串
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: Option<String>,
    pub grammar: Option<String>,
    pub source: Option<String>,
    pub scanner: Option<String>,
}

/// `--config` 指定的 JSON 配置文件
///
/// ```json
/// { "lexer": { "recovery": "skip" }, "log": { "level": "info", "scanner": "trace" } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub lexer: LexerConfig,
    pub log: LogSection,
}

impl ConfigFile {
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self, CliError> {
        serde_json::from_str(json).map_err(|e| CliError::Config {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let origin = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| CliError::Config {
            path: origin.clone(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&content, &origin)
    }

    /// 生成日志配置，`override_level` 来自命令行，优先于文件中的全局级别
    pub fn log_config(&self, override_level: Option<&str>) -> Result<LogConfig, CliError> {
        let global = match override_level.or(self.log.level.as_deref()) {
            Some(level) => parse_log_level(level)?,
            None => LogConfig::default().global,
        };
        Ok(LogConfig {
            global,
            grammar: self.log.grammar.as_deref().map(parse_log_level).transpose()?,
            source: self.log.source.as_deref().map(parse_log_level).transpose()?,
            scanner: self.log.scanner.as_deref().map(parse_log_level).transpose()?,
        })
    }
}

/// Parse log level string
pub fn parse_log_level(s: &str) -> Result<Level, CliError> {
    match s.to_lowercase().as_str() {
        "silent" => Ok(Level::ERROR), // silent = only errors
        other => Level::from_str(other).map_err(|_| CliError::InvalidLogLevel(s.to_string())),
    }
}
