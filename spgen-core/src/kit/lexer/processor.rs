//! 扫描引擎
//!
//! 每个 token 的流程：
//! 1. 记录起始位置，从当前字符起逐个预读喂给当前模式的 DFA
//! 2. 记住最后一次接受时的长度和规则（同长度先声明的规则胜出）
//! 3. DFA 死亡或输入结束时，消费恰好最长匹配的字符数
//! 4. 没有任何接受：DFA 在输入结束时仍存活为未终止 token，否则为非法字符
//!
//! 引擎不缓存 token，每个 token 同步交给 listener。

use std::sync::Arc;

use serde::Serialize;
use spgen_config::{LexerConfig, RecoveryPolicy};
use tracing::{debug, trace};

use super::builder::LexerProcessorBuilder;
use super::context::{LexerContext, ModeId};
use super::core::{SourceBuffer, SourcePosition, SourceSpan};
use super::error::{LexError, LexErrorKind, SourceError};
use super::listener::{TokenListener, VisitAction};
use super::state_machine::DfaCache;
use super::token::TokenInfo;
use crate::grammar::rules::{ModeAction, RuleSet};

/// 一次扫描的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScanStats {
    /// 交给 `visit` 的 token 数
    pub tokens: usize,
    /// 交给 `visit_skipped` 的文本段数
    pub skipped: usize,
    /// Skip 策略下恢复的错误数
    pub errors_recovered: usize,
    /// listener 返回了 `VisitAction::Stop`
    pub stopped: bool,
}

/// 单个 token 的匹配结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Accept { rule: usize, len: usize },
    /// 输入结束时仍有规则在匹配中，len 为已读字符数
    Unterminated { len: usize },
    Unrecognized(char),
}

/// 词法处理器
///
/// 拥有自己的字符源和 DFA 缓存，规则表通过 `Arc` 共享。
/// 每次 `process` 都从输入开头重新扫描。
pub struct LexerProcessor<K> {
    source: SourceBuffer,
    rules: Arc<RuleSet<K>>,
    /// 每个模式一个 DFA 缓存，下标为 ModeId
    automata: Vec<DfaCache>,
    config: LexerConfig,
}

impl<K: Clone> LexerProcessor<K> {
    pub fn builder(rules: Arc<RuleSet<K>>) -> LexerProcessorBuilder<K> {
        LexerProcessorBuilder::new(rules)
    }

    pub(crate) fn new(source: SourceBuffer, rules: Arc<RuleSet<K>>, config: LexerConfig) -> Self {
        let automata = rules
            .modes()
            .iter()
            .map(|mode| DfaCache::new(mode.nfa()))
            .collect();
        Self {
            source,
            rules,
            automata,
            config,
        }
    }

    pub fn rules(&self) -> &Arc<RuleSet<K>> {
        &self.rules
    }

    pub fn config(&self) -> &LexerConfig {
        &self.config
    }

    /// 文件路径或 `<text>`
    pub fn source_name(&self) -> String {
        self.source.name()
    }

    /// 扫描整个输入，把 token 依次交给 listener
    ///
    /// 返回扫描统计，或第一个未恢复的错误。
    /// listener 返回 `Stop` 时立即正常返回，不再调用 `end_of_stream`。
    pub fn process<L>(&mut self, mut listener: L) -> Result<ScanStats, LexError>
    where
        L: TokenListener<K>,
    {
        self.source
            .rewind()
            .map_err(|e| source_failure(e, SourcePosition::start()))?;
        let rules = Arc::clone(&self.rules);
        let mut ctx = LexerContext::new(rules.mode_names());
        let mut stats = ScanStats::default();

        debug!(
            target: "spgen::scanner",
            source = %self.source.name(),
            recovery = ?self.config.recovery,
            "Scan started"
        );

        loop {
            let start = self.source.current_position();
            ctx.begin_token(start);
            let mode = ctx.current_mode();
            let Some(scan) = self.longest_match(&rules, mode)? else {
                break;
            };

            let action = match scan {
                Scan::Accept { rule, len } => {
                    let lexeme = self.consume(len)?;
                    let end = self.source.current_position();
                    let rule = &rules.rules()[rule];

                    if rule.action == Some(ModeAction::Pop) && ctx.mode_depth() <= 1 {
                        let error = LexError::at(LexErrorKind::ModeStackUnderflow, start, lexeme);
                        self.recover(&mut ctx, &mut listener, error)?
                    } else {
                        let token = TokenInfo::new(rule.kind.clone(), lexeme, SourceSpan::range(start, end));
                        trace!(
                            target: "spgen::scanner",
                            span = %token.span,
                            lexeme = %token.lexeme,
                            skip = rule.skip,
                            "Matched token"
                        );
                        let action = if rule.skip {
                            ctx.record_skipped();
                            listener.visit_skipped(&ctx, token)
                        } else {
                            listener.before_token(&ctx, &token);
                            ctx.record_visited();
                            listener.visit(&ctx, token)
                        };
                        match rule.action {
                            Some(ModeAction::Push(next_mode)) => {
                                debug!(target: "spgen::scanner", mode = %mode_name(&rules, next_mode), "Push mode");
                                ctx.push_mode(next_mode);
                            }
                            Some(ModeAction::Pop) => {
                                ctx.pop_mode();
                                debug!(target: "spgen::scanner", mode = %ctx.current_mode_name(), "Pop mode");
                            }
                            None => {}
                        }
                        action
                    }
                }
                Scan::Unterminated { len } => {
                    let lexeme = self.consume(len)?;
                    let error = LexError::at(LexErrorKind::UnterminatedToken, start, lexeme);
                    self.recover(&mut ctx, &mut listener, error)?
                }
                Scan::Unrecognized(ch) => {
                    let lexeme = match self.config.recovery {
                        RecoveryPolicy::Halt => ch.to_string(),
                        RecoveryPolicy::Skip => self.skip_unrecognized(&rules, mode)?,
                    };
                    let error = LexError::at(LexErrorKind::UnrecognizedSymbol(ch), start, lexeme);
                    self.recover(&mut ctx, &mut listener, error)?
                }
            };

            if action == VisitAction::Stop {
                debug!(target: "spgen::scanner", position = %self.source.current_position(), "Scan stopped by listener");
                stats.stopped = true;
                break;
            }
        }

        stats.tokens = ctx.tokens_visited();
        stats.skipped = ctx.tokens_skipped();
        stats.errors_recovered = ctx.errors_recovered();

        if !stats.stopped && self.config.emit_end_of_stream {
            listener.end_of_stream(&ctx, self.source.current_position());
        }
        debug!(
            target: "spgen::scanner",
            tokens = stats.tokens,
            skipped = stats.skipped,
            errors = stats.errors_recovered,
            stopped = stats.stopped,
            "Scan finished"
        );
        Ok(stats)
    }

    /// Halt 策略直接返回错误；Skip 策略报告给 listener 后继续
    fn recover<L>(
        &self,
        ctx: &mut LexerContext,
        listener: &mut L,
        error: LexError,
    ) -> Result<VisitAction, LexError>
    where
        L: TokenListener<K>,
    {
        match self.config.recovery {
            RecoveryPolicy::Halt => {
                debug!(target: "spgen::scanner", %error, "Scan halted");
                Err(error)
            }
            RecoveryPolicy::Skip => {
                debug!(target: "spgen::scanner", %error, discarded = %error.lexeme, "Recovered from lexical error");
                ctx.record_error();
                Ok(listener.visit_error(ctx, &error))
            }
        }
    }

    /// 最长匹配，不消费字符；输入已结束时返回 None
    ///
    /// 只在读入至少一个字符后记录接受，零长度匹配永远不会被接受。
    fn longest_match(&mut self, rules: &RuleSet<K>, mode: ModeId) -> Result<Option<Scan>, LexError> {
        let position = self.source.current_position();
        let nfa = rules.modes()[mode].nfa();
        let dfa = &mut self.automata[mode];

        let mut state = dfa.start();
        let mut best: Option<(usize, usize)> = None;
        let mut first = None;
        let mut read = 0;
        let alive_at_end = loop {
            let c = match self.source.peek_nth(read) {
                Ok(Some(c)) => c,
                Ok(None) => break read > 0,
                Err(e) => return Err(source_failure(e, position)),
            };
            first.get_or_insert(c);
            match dfa.next(nfa, state, c) {
                Some(next) => {
                    state = next;
                    read += 1;
                    if let Some(rule) = dfa.accept(state) {
                        best = Some((rule, read));
                    }
                }
                None => break false,
            }
        };

        let Some(first) = first else {
            return Ok(None);
        };
        Ok(Some(match best {
            Some((rule, len)) => Scan::Accept { rule, len },
            None if alive_at_end => Scan::Unterminated { len: read },
            None => Scan::Unrecognized(first),
        }))
    }

    /// 丢弃非法字符以及后续所有不能作为当前模式任何规则开头的字符
    fn skip_unrecognized(&mut self, rules: &RuleSet<K>, mode: ModeId) -> Result<String, LexError> {
        let mut discarded = self.consume(1)?;
        let nfa = rules.modes()[mode].nfa();
        let dfa = &mut self.automata[mode];
        loop {
            let position = self.source.current_position();
            let c = match self.source.peek_char() {
                Ok(Some(c)) => c,
                Ok(None) => break,
                Err(e) => return Err(source_failure(e, position)),
            };
            if dfa.can_start(nfa, c) {
                break;
            }
            match self.source.next_char() {
                Ok(Some(c)) => discarded.push(c),
                Ok(None) => break,
                Err(e) => return Err(source_failure(e, position)),
            }
        }
        Ok(discarded)
    }

    /// 消费 n 个字符并返回其文本
    fn consume(&mut self, n: usize) -> Result<String, LexError> {
        let position = self.source.current_position();
        let mut lexeme = String::new();
        for _ in 0..n {
            match self.source.next_char() {
                Ok(Some(c)) => lexeme.push(c),
                Ok(None) => break,
                Err(e) => return Err(source_failure(e, position)),
            }
        }
        Ok(lexeme)
    }
}

fn source_failure(error: SourceError, position: SourcePosition) -> LexError {
    LexError::at(LexErrorKind::Source(error), position, "")
}

fn mode_name<K>(rules: &RuleSet<K>, mode: ModeId) -> &str {
    rules.mode(mode).map(|m| m.name.as_str()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::test01::{self, Test01Token};
    use crate::kit::lexer::listener::TokenCollector;

    fn processor(text: &str) -> LexerProcessor<Test01Token> {
        LexerProcessor::builder(Arc::new(test01::rules().unwrap()))
            .source_text(text)
            .build()
            .unwrap()
    }

    #[test]
    fn test_longest_match_prefers_double_equals() {
        let mut collector = TokenCollector::new();
        processor("==").process(&mut collector).unwrap();
        assert_eq!(collector.lexemes(), vec!["=="]);
    }

    #[test]
    fn test_empty_input_only_ends_stream() {
        let mut collector = TokenCollector::new();
        let stats = processor("").process(&mut collector).unwrap();
        assert_eq!(stats, ScanStats::default());
        assert_eq!(collector.end_position(), Some(SourcePosition::start()));
    }

    #[test]
    fn test_unrecognized_symbol_halts() {
        let mut collector = TokenCollector::new();
        let err = processor("ab @cd").process(&mut collector).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnrecognizedSymbol('@'));
        assert_eq!((err.line(), err.column()), (1, 4));
        assert_eq!(err.lexeme, "@");
        // 错误之前的 token 已经交付
        assert_eq!(collector.lexemes(), vec!["ab"]);
        assert_eq!(collector.end_position(), None);
    }

    #[test]
    fn test_stats_count_tokens_and_skips() {
        let stats = processor("a = 1").process(TokenCollector::new()).unwrap();
        assert_eq!(stats.tokens, 3);
        assert_eq!(stats.skipped, 2);
        assert!(!stats.stopped);
    }

    #[test]
    fn test_process_twice_rescans_from_start() {
        let mut p = processor("x y");
        let mut first = TokenCollector::new();
        let mut second = TokenCollector::new();
        p.process(&mut first).unwrap();
        p.process(&mut second).unwrap();
        assert_eq!(first.tokens(), second.tokens());
    }
}
