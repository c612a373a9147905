//! 扫描上下文
//!
//! 每次 `process` 调用创建一个，只有处理器能修改；listener 只读访问。

use std::sync::Arc;

use super::core::SourcePosition;

/// 模式编号（`RuleSet` 内的下标）
pub type ModeId = usize;

/// 单次扫描的可变状态
#[derive(Debug, Clone)]
pub struct LexerContext {
    /// 当前 token 的起始位置
    token_start: SourcePosition,
    /// 模式栈，栈底为默认模式
    mode_stack: Vec<ModeId>,
    mode_names: Arc<[String]>,
    tokens_visited: usize,
    tokens_skipped: usize,
    errors_recovered: usize,
}

impl LexerContext {
    pub(crate) fn new(mode_names: Arc<[String]>) -> Self {
        Self {
            token_start: SourcePosition::start(),
            mode_stack: vec![0],
            mode_names,
            tokens_visited: 0,
            tokens_skipped: 0,
            errors_recovered: 0,
        }
    }

    /// 当前 token 的起始位置
    pub fn token_start(&self) -> SourcePosition {
        self.token_start
    }

    /// 栈顶模式
    pub fn current_mode(&self) -> ModeId {
        self.mode_stack.last().copied().unwrap_or(0)
    }

    /// 栈顶模式名称
    pub fn current_mode_name(&self) -> &str {
        self.mode_names
            .get(self.current_mode())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// 模式栈深度（只有默认模式时为 1）
    pub fn mode_depth(&self) -> usize {
        self.mode_stack.len()
    }

    pub fn tokens_visited(&self) -> usize {
        self.tokens_visited
    }

    pub fn tokens_skipped(&self) -> usize {
        self.tokens_skipped
    }

    pub fn errors_recovered(&self) -> usize {
        self.errors_recovered
    }

    pub(crate) fn begin_token(&mut self, start: SourcePosition) {
        self.token_start = start;
    }

    pub(crate) fn push_mode(&mut self, mode: ModeId) {
        self.mode_stack.push(mode);
    }

    /// 弹出栈顶模式；只剩默认模式时返回 false
    pub(crate) fn pop_mode(&mut self) -> bool {
        if self.mode_stack.len() <= 1 {
            return false;
        }
        self.mode_stack.pop();
        true
    }

    pub(crate) fn record_visited(&mut self) {
        self.tokens_visited += 1;
    }

    pub(crate) fn record_skipped(&mut self) {
        self.tokens_skipped += 1;
    }

    pub(crate) fn record_error(&mut self) {
        self.errors_recovered += 1;
    }
}
