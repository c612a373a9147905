//! Token 输出
//!
//! `PrintListener` 边扫描边写出 token，不在内存中收集整个序列。

use std::fmt::Display;
use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;
use spgen_core::{LexError, LexerContext, TokenInfo, TokenListener, VisitAction};
use tracing::warn;

/// stdout 上的 token 格式
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `line:column<TAB>kind<TAB>"lexeme"`
    Text,
    /// 每行一个 JSON 对象
    Json,
}

#[derive(Serialize)]
struct Record<'a, K> {
    #[serde(flatten)]
    token: &'a TokenInfo<K>,
    mode: &'a str,
    skipped: bool,
}

/// 把 token 写到 `out` 的 listener
///
/// 写入失败时停止扫描，错误由 `finish` 返回。
pub struct PrintListener<W> {
    out: W,
    format: OutputFormat,
    show_skipped: bool,
    failure: Option<io::Error>,
}

impl<W: Write> PrintListener<W> {
    pub fn new(out: W, format: OutputFormat, show_skipped: bool) -> Self {
        Self {
            out,
            format,
            show_skipped,
            failure: None,
        }
    }

    /// 刷新输出，返回扫描期间的第一个写入错误
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.failure.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_token<K>(&mut self, ctx: &LexerContext, token: &TokenInfo<K>, skipped: bool) -> VisitAction
    where
        K: Display + Serialize,
    {
        let result = match self.format {
            OutputFormat::Text => {
                let marker = if skipped { " (skipped)" } else { "" };
                writeln!(
                    self.out,
                    "{}:{}\t{}{}\t{:?}",
                    token.span.start.line, token.span.start.column, token.kind, marker, token.lexeme
                )
            }
            OutputFormat::Json => {
                let record = Record {
                    token,
                    mode: ctx.current_mode_name(),
                    skipped,
                };
                serde_json::to_writer(&mut self.out, &record)
                    .map_err(io::Error::from)
                    .and_then(|()| writeln!(self.out))
            }
        };
        match result {
            Ok(()) => VisitAction::Continue,
            Err(e) => {
                self.failure = Some(e);
                VisitAction::Stop
            }
        }
    }
}

impl<K, W> TokenListener<K> for PrintListener<W>
where
    K: Display + Serialize,
    W: Write,
{
    fn visit(&mut self, ctx: &LexerContext, token: TokenInfo<K>) -> VisitAction {
        self.write_token(ctx, &token, false)
    }

    fn visit_skipped(&mut self, ctx: &LexerContext, token: TokenInfo<K>) -> VisitAction {
        if self.show_skipped {
            self.write_token(ctx, &token, true)
        } else {
            VisitAction::Continue
        }
    }

    fn visit_error(&mut self, _ctx: &LexerContext, error: &LexError) -> VisitAction {
        warn!(target: "spgen::cli", lexeme = %error.lexeme, "skipped: {}", error);
        VisitAction::Continue
    }
}
