//! Token 分发协议
//!
//! 处理器按顺序、同步地把每个 token 交给 listener。
//! 只有 `visit` 是下游解析器通常需要实现的入口，其余钩子都有默认实现。

use super::context::LexerContext;
use super::core::SourcePosition;
use super::error::LexError;
use super::token::TokenInfo;

/// listener 对一次分发的回应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitAction {
    /// 继续扫描
    #[default]
    Continue,
    /// 停止扫描，`process` 正常返回
    Stop,
}

/// Token listener
pub trait TokenListener<K> {
    /// 在 `visit` 之前调用
    fn before_token(&mut self, _ctx: &LexerContext, _token: &TokenInfo<K>) {}

    /// 每个被识别的 token 调用一次
    fn visit(&mut self, _ctx: &LexerContext, _token: TokenInfo<K>) -> VisitAction {
        VisitAction::Continue
    }

    /// skip 规则匹配的文本（空白、注释）
    fn visit_skipped(&mut self, _ctx: &LexerContext, _token: TokenInfo<K>) -> VisitAction {
        VisitAction::Continue
    }

    /// 仅在 `RecoveryPolicy::Skip` 下调用，`error.lexeme` 为被丢弃的文本
    fn visit_error(&mut self, _ctx: &LexerContext, _error: &LexError) -> VisitAction {
        VisitAction::Continue
    }

    /// 输入结束
    fn end_of_stream(&mut self, _ctx: &LexerContext, _position: SourcePosition) {}
}

impl<K, L> TokenListener<K> for &mut L
where
    L: TokenListener<K> + ?Sized,
{
    fn before_token(&mut self, ctx: &LexerContext, token: &TokenInfo<K>) {
        (**self).before_token(ctx, token)
    }

    fn visit(&mut self, ctx: &LexerContext, token: TokenInfo<K>) -> VisitAction {
        (**self).visit(ctx, token)
    }

    fn visit_skipped(&mut self, ctx: &LexerContext, token: TokenInfo<K>) -> VisitAction {
        (**self).visit_skipped(ctx, token)
    }

    fn visit_error(&mut self, ctx: &LexerContext, error: &LexError) -> VisitAction {
        (**self).visit_error(ctx, error)
    }

    fn end_of_stream(&mut self, ctx: &LexerContext, position: SourcePosition) {
        (**self).end_of_stream(ctx, position)
    }
}

/// 收集所有 token 的 listener
///
/// `keep_skipped` 打开时同时保留 skip 文本和错误文本，
/// 可以用 `consumed_text` 还原输入。
#[derive(Debug, Clone)]
pub struct TokenCollector<K> {
    tokens: Vec<TokenInfo<K>>,
    skipped: Vec<TokenInfo<K>>,
    errors: Vec<LexError>,
    consumed: String,
    keep_skipped: bool,
    end: Option<SourcePosition>,
}

impl<K> TokenCollector<K> {
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
            consumed: String::new(),
            keep_skipped: false,
            end: None,
        }
    }

    /// 同时保留 skip 文本
    pub fn with_skipped() -> Self {
        Self {
            keep_skipped: true,
            ..Self::new()
        }
    }

    pub fn tokens(&self) -> &[TokenInfo<K>] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<TokenInfo<K>> {
        self.tokens
    }

    pub fn skipped(&self) -> &[TokenInfo<K>] {
        &self.skipped
    }

    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    /// 按顺序拼接的 token/skip/错误文本（仅 `with_skipped` 时完整）
    pub fn consumed_text(&self) -> &str {
        &self.consumed
    }

    /// 收到 end-of-stream 时的位置
    pub fn end_position(&self) -> Option<SourcePosition> {
        self.end
    }

    pub fn kinds(&self) -> Vec<&K> {
        self.tokens.iter().map(|t| &t.kind).collect()
    }

    pub fn lexemes(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.lexeme.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.skipped.clear();
        self.errors.clear();
        self.consumed.clear();
        self.end = None;
    }
}

impl<K> Default for TokenCollector<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TokenListener<K> for TokenCollector<K> {
    fn visit(&mut self, _ctx: &LexerContext, token: TokenInfo<K>) -> VisitAction {
        self.consumed.push_str(&token.lexeme);
        self.tokens.push(token);
        VisitAction::Continue
    }

    fn visit_skipped(&mut self, _ctx: &LexerContext, token: TokenInfo<K>) -> VisitAction {
        if self.keep_skipped {
            self.consumed.push_str(&token.lexeme);
            self.skipped.push(token);
        }
        VisitAction::Continue
    }

    fn visit_error(&mut self, _ctx: &LexerContext, error: &LexError) -> VisitAction {
        if self.keep_skipped {
            self.consumed.push_str(&error.lexeme);
        }
        self.errors.push(error.clone());
        VisitAction::Continue
    }

    fn end_of_stream(&mut self, _ctx: &LexerContext, position: SourcePosition) {
        self.end = Some(position);
    }
}
