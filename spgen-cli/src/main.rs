//! spgen-lex - tokenize a file or text with an spgen rule table
//!
//! Without `--grammar` the built-in Test01 rules are used.

use std::fmt::Display;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use spgen_config::{LexerConfig, RecoveryPolicy};
use spgen_core::grammar::test01;
use spgen_core::{GrammarDefinition, LexerProcessor, RuleSet, ScanStats};
use tracing::{debug, info};

mod config;
mod error;
mod logging;
mod output;
mod platform;

use crate::config::ConfigFile;
use crate::error::CliError;
use crate::logging::LogFormat;
use crate::output::{OutputFormat, PrintListener};
use crate::platform::cli::print_error_with_source;

#[derive(Parser, Debug)]
#[command(
    name = "spgen-lex",
    about = "Tokenize a file or text with an spgen lexer rule table",
    version
)]
struct Cli {
    /// Input file to tokenize
    #[arg(value_name = "FILE", required_unless_present = "text", conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Tokenize this text instead of a file
    #[arg(long, value_name = "TEXT")]
    text: Option<String>,

    /// Grammar definition file (default: built-in Test01 rules)
    #[arg(long, value_name = "FILE")]
    grammar: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Token output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Report lexical errors and keep scanning
    #[arg(long)]
    recover: bool,

    /// Also print skipped text (whitespace, comments)
    #[arg(long)]
    show_skipped: bool,

    /// Log level: "silent", "error", "warn", "info", "debug", "trace"
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

/// 扫描的输入
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    File(PathBuf),
    Text(String),
}

impl Input {
    fn name(&self) -> String {
        match self {
            Input::File(path) => path.display().to_string(),
            Input::Text(_) => "<text>".to_string(),
        }
    }

    /// 错误上下文用的输入文本，文件读取失败时放弃上下文
    fn text_for_context(&self) -> Option<String> {
        match self {
            Input::File(path) => std::fs::read(path)
                .ok()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
            Input::Text(text) => Some(text.clone()),
        }
    }
}

/// 命令行与配置文件合并后的运行参数
#[derive(Debug)]
struct Options {
    input: Input,
    grammar: Option<PathBuf>,
    lexer: LexerConfig,
    format: OutputFormat,
    show_skipped: bool,
}

impl Cli {
    fn into_options(self, file: ConfigFile) -> Options {
        let input = match (self.text, self.input) {
            (Some(text), _) => Input::Text(text),
            (None, Some(path)) => Input::File(path),
            // clap 保证二者之一存在
            (None, None) => Input::Text(String::new()),
        };
        let mut lexer = file.lexer;
        if self.recover {
            lexer.recovery = RecoveryPolicy::Skip;
        }
        Options {
            input,
            grammar: self.grammar,
            lexer,
            format: self.format,
            show_skipped: self.show_skipped,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_and_run(cli) {
        print_error_with_source(&e);
        process::exit(1);
    }
}

fn setup_and_run(cli: Cli) -> Result<(), CliError> {
    let file = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let log_config = file.log_config(cli.log_level.as_deref())?;
    logging::init(&log_config, cli.log_format)?;

    let options = cli.into_options(file);
    debug!(target: "spgen::cli", ?options, "Options resolved");

    let stdout = io::stdout();
    let stats = run(&options, stdout.lock())?;
    info!(
        target: "spgen::cli",
        tokens = stats.tokens,
        skipped = stats.skipped,
        errors = stats.errors_recovered,
        "Done"
    );
    Ok(())
}

/// 选择规则表并扫描，token 写到 `out`
fn run<W: Write>(options: &Options, out: W) -> Result<ScanStats, CliError> {
    match &options.grammar {
        Some(path) => {
            let rules = load_grammar(path)?;
            scan(Arc::new(rules), options, out)
        }
        None => scan(Arc::new(test01::rules()?), options, out),
    }
}

fn load_grammar(path: &Path) -> Result<RuleSet<String>, CliError> {
    let path_display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| CliError::Read {
        path: path_display.clone(),
        message: e.to_string(),
    })?;
    match GrammarDefinition::parse(&text) {
        Ok(definition) => {
            debug!(
                target: "spgen::cli",
                grammar = %path_display,
                rules = definition.rules().rules().len(),
                "Grammar loaded"
            );
            Ok(definition.into_rules())
        }
        Err(error) => Err(CliError::Grammar {
            path: path_display,
            error,
            text,
        }),
    }
}

fn scan<K, W>(rules: Arc<RuleSet<K>>, options: &Options, out: W) -> Result<ScanStats, CliError>
where
    K: Clone + Display + Serialize,
    W: Write,
{
    let builder = LexerProcessor::builder(rules).config(options.lexer.clone());
    let builder = match &options.input {
        Input::File(path) => builder.source_file(path),
        Input::Text(text) => builder.source_text(text.clone()),
    };
    let mut processor = builder.build()?;

    let mut listener = PrintListener::new(out, options.format, options.show_skipped);
    let stats = processor
        .process(&mut listener)
        .map_err(|error| CliError::Lex {
            name: options.input.name(),
            error,
            text: options.input.text_for_context(),
        })?;
    listener
        .finish()
        .map_err(|e| CliError::Output(e.to_string()))?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spgen_core::LexErrorKind;
    use tempfile::NamedTempFile;

    fn options(input: Input) -> Options {
        Options {
            input,
            grammar: None,
            lexer: LexerConfig::default(),
            format: OutputFormat::Text,
            show_skipped: false,
        }
    }

    fn temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn run_to_string(options: &Options) -> Result<String, CliError> {
        let mut out = Vec::new();
        run(options, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["spgen-lex", "--text", "a = 1", "--recover"]).unwrap();
        let options = cli.into_options(ConfigFile::default());
        assert_eq!(options.input, Input::Text("a = 1".to_string()));
        assert_eq!(options.lexer.recovery, RecoveryPolicy::Skip);

        let cli = Cli::try_parse_from(["spgen-lex", "input.txt", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let options = cli.into_options(ConfigFile::default());
        assert_eq!(options.input, Input::File(PathBuf::from("input.txt")));
        assert_eq!(options.lexer.recovery, RecoveryPolicy::Halt);
    }

    #[test]
    fn test_cli_requires_exactly_one_input() {
        assert!(Cli::try_parse_from(["spgen-lex"]).is_err());
        assert!(Cli::try_parse_from(["spgen-lex", "file.txt", "--text", "x"]).is_err());
    }

    #[test]
    fn test_run_test01_text() {
        let out = run_to_string(&options(Input::Text("abc == 324".to_string()))).unwrap();
        assert_eq!(
            out,
            "1:1\tIdentifier\t\"abc\"\n1:5\tOperator\t\"==\"\n1:8\tInteger\t\"324\"\n"
        );
    }

    #[test]
    fn test_run_with_grammar_file() {
        let grammar = temp_file("token Word : '\\w'+;\nskip Space : ' '+;\n");
        let input = temp_file("hello world");
        let mut opts = options(Input::File(input.path().to_path_buf()));
        opts.grammar = Some(grammar.path().to_path_buf());
        opts.show_skipped = true;

        let out = run_to_string(&opts).unwrap();
        assert_eq!(
            out,
            "1:1\tWord\t\"hello\"\n1:6\tSpace (skipped)\t\" \"\n1:7\tWord\t\"world\"\n"
        );
    }

    #[test]
    fn test_lex_error_carries_context() {
        let err = run_to_string(&options(Input::Text("a = 1\nb $ 2".to_string()))).unwrap_err();
        match &err {
            CliError::Lex { error, .. } => {
                assert_eq!(error.kind, LexErrorKind::UnrecognizedSymbol('$'));
            }
            other => panic!("unexpected error: {}", other),
        }
        let (text, line, column) = err.source_context().unwrap();
        assert_eq!((line, column), (2, 3));
        assert!(text.starts_with("a = 1"));
    }

    #[test]
    fn test_recover_keeps_scanning() {
        let mut opts = options(Input::Text("a $ b".to_string()));
        opts.lexer.recovery = RecoveryPolicy::Skip;
        let out = run_to_string(&opts).unwrap();
        assert_eq!(out, "1:1\tIdentifier\t\"a\"\n1:5\tIdentifier\t\"b\"\n");
    }

    #[test]
    fn test_grammar_error_carries_context() {
        let grammar = temp_file("token A : 'a';\ntoken B : @;\n");
        let mut opts = options(Input::Text("a".to_string()));
        opts.grammar = Some(grammar.path().to_path_buf());

        let err = run_to_string(&opts).unwrap_err();
        assert!(matches!(err, CliError::Grammar { .. }));
        let (_, line, _) = err.source_context().unwrap();
        assert_eq!(line, 2);
    }

    #[test]
    fn test_missing_input_file() {
        let err = run_to_string(&options(Input::File(PathBuf::from("/nonexistent/path"))))
            .unwrap_err();
        assert!(matches!(err, CliError::Build(_)));
        assert!(err.source_context().is_none());
    }
}
