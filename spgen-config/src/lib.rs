//! spgen Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all spgen crates.

use serde::{Deserialize, Serialize};

/// What the scanner does after a lexical error
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryPolicy {
    /// Return the first error and stop producing tokens
    #[default]
    Halt,
    /// Report the error to the listener, discard the offending input and continue
    Skip,
}

/// Configuration for scanner behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexerConfig {
    /// Error recovery policy
    pub recovery: RecoveryPolicy,
    /// Whether the listener's end-of-stream hook is called after the last token
    pub emit_end_of_stream: bool,
    /// Bytes read from a file-backed source per refill
    pub read_chunk_size: usize,
}

impl LexerConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            recovery: RecoveryPolicy::Halt,
            emit_end_of_stream: true,
            read_chunk_size: 8 * 1024,
        }
    }
}

/// Processing phase, used to name log targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Grammar,
    Source,
    Scanner,
    Cli,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Grammar, Phase::Source, Phase::Scanner, Phase::Cli];

    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Grammar => "grammar",
            Phase::Source => "source",
            Phase::Scanner => "scanner",
            Phase::Cli => "cli",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("spgen::{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lexer_config() {
        let cfg = LexerConfig::default();
        assert_eq!(cfg.recovery, RecoveryPolicy::Halt);
        assert!(cfg.emit_end_of_stream);
        assert_eq!(cfg.read_chunk_size, 8192);
    }

    #[test]
    fn test_config_from_partial_json() {
        let cfg = LexerConfig::from_json_str(r#"{ "recovery": "skip" }"#).unwrap();
        assert_eq!(cfg.recovery, RecoveryPolicy::Skip);
        assert!(cfg.emit_end_of_stream);
    }

    #[test]
    fn test_config_rejects_unknown_policy() {
        assert!(LexerConfig::from_json_str(r#"{ "recovery": "retry" }"#).is_err());
    }

    #[test]
    fn test_phase_as_str() {
        assert_eq!(Phase::Scanner.as_str(), "scanner");
        assert_eq!(Phase::Source.target(), "spgen::source");
    }
}
