//! 规则表
//!
//! 生成的词法分析器只是一张规则表：有序的 token 规则、skip 规则、fragment 和模式。
//! 构建时完成全部校验并把每个模式编译成 NFA，之后不可变，可以用 `Arc` 在多个处理器间共享。

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::pattern::{Pattern, PatternError};
use crate::kit::lexer::context::ModeId;
use crate::kit::lexer::state_machine::Nfa;

/// 默认模式名称
pub const DEFAULT_MODE: &str = "default";

/// 规则表构建错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Rule set has no token or skip rules")]
    Empty,

    #[error("Undefined fragment '{0}'")]
    UndefinedFragment(String),

    #[error("Fragment '{0}' refers to itself")]
    RecursiveFragment(String),

    #[error("Fragment '{0}' is defined more than once")]
    DuplicateFragment(String),

    #[error("Unknown mode '{0}'")]
    UnknownMode(String),

    #[error("Mode action declared before any rule")]
    ActionWithoutRule,

    #[error("Invalid pattern for '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: PatternError,
    },
}

/// 规则被接受后对模式栈的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeAction {
    Push(ModeId),
    Pop,
}

/// 一条 token/skip 规则
#[derive(Debug, Clone)]
pub struct Rule<K> {
    pub kind: K,
    pub pattern: Pattern,
    /// skip 规则的文本交给 `visit_skipped`
    pub skip: bool,
    /// 所属模式
    pub mode: ModeId,
    pub action: Option<ModeAction>,
}

/// 模式：一组同时生效的规则
#[derive(Debug, Clone)]
pub struct LexerMode {
    pub name: String,
    /// 规则下标，按声明顺序
    pub rules: Vec<usize>,
    nfa: Nfa,
}

impl LexerMode {
    pub fn nfa(&self) -> &Nfa {
        &self.nfa
    }
}

/// 不可变的规则表
#[derive(Debug, Clone)]
pub struct RuleSet<K> {
    rules: Vec<Rule<K>>,
    modes: Vec<LexerMode>,
    mode_names: Arc<[String]>,
    fragments: HashMap<String, Pattern>,
}

impl<K> RuleSet<K> {
    pub fn builder() -> RuleSetBuilder<K> {
        RuleSetBuilder::new()
    }

    pub fn rules(&self) -> &[Rule<K>] {
        &self.rules
    }

    pub fn rule(&self, index: usize) -> Option<&Rule<K>> {
        self.rules.get(index)
    }

    pub fn modes(&self) -> &[LexerMode] {
        &self.modes
    }

    pub fn mode(&self, id: ModeId) -> Option<&LexerMode> {
        self.modes.get(id)
    }

    pub fn mode_id(&self, name: &str) -> Option<ModeId> {
        self.modes.iter().position(|m| m.name == name)
    }

    pub fn mode_names(&self) -> Arc<[String]> {
        Arc::clone(&self.mode_names)
    }

    pub fn fragment(&self, name: &str) -> Option<&Pattern> {
        self.fragments.get(name)
    }
}

/// 参与构建的表达式：`Pattern` 或表达式记法字符串
pub trait IntoPattern {
    fn into_pattern(self) -> Result<Pattern, PatternError>;
}

impl IntoPattern for Pattern {
    fn into_pattern(self) -> Result<Pattern, PatternError> {
        Ok(self)
    }
}

impl IntoPattern for &str {
    fn into_pattern(self) -> Result<Pattern, PatternError> {
        Pattern::parse(self)
    }
}

impl IntoPattern for String {
    fn into_pattern(self) -> Result<Pattern, PatternError> {
        Pattern::parse(&self)
    }
}

enum PendingAction {
    Push(String),
    Pop,
}

struct PendingRule<K> {
    kind: K,
    pattern: Result<Pattern, PatternError>,
    skip: bool,
    mode: ModeId,
    action: Option<PendingAction>,
}

/// 规则表构建器
///
/// 规则按调用顺序声明，匹配长度相同时先声明的规则胜出。
/// `mode(name)` 之后声明的规则属于该模式。
pub struct RuleSetBuilder<K> {
    fragments: Vec<(String, Result<Pattern, PatternError>)>,
    rules: Vec<PendingRule<K>>,
    modes: Vec<String>,
    current_mode: ModeId,
    misplaced_action: bool,
}

impl<K> RuleSetBuilder<K> {
    pub fn new() -> Self {
        Self {
            fragments: Vec::new(),
            rules: Vec::new(),
            modes: vec![DEFAULT_MODE.to_string()],
            current_mode: 0,
            misplaced_action: false,
        }
    }

    /// 具名 fragment，只能被其他规则引用
    pub fn fragment(mut self, name: impl Into<String>, pattern: impl IntoPattern) -> Self {
        self.fragments.push((name.into(), pattern.into_pattern()));
        self
    }

    pub fn token(self, kind: K, pattern: impl IntoPattern) -> Self {
        self.rule(kind, pattern, false)
    }

    /// 匹配的文本被丢弃（空白、注释）
    pub fn skip(self, kind: K, pattern: impl IntoPattern) -> Self {
        self.rule(kind, pattern, true)
    }

    /// 切换声明目标模式，不存在则创建
    pub fn mode(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.current_mode = match self.modes.iter().position(|m| *m == name) {
            Some(id) => id,
            None => {
                self.modes.push(name);
                self.modes.len() - 1
            }
        };
        self
    }

    /// 最后一条规则被接受后压入模式
    pub fn push_mode(self, name: impl Into<String>) -> Self {
        self.with_action(PendingAction::Push(name.into()))
    }

    /// 最后一条规则被接受后弹出模式
    pub fn pop_mode(self) -> Self {
        self.with_action(PendingAction::Pop)
    }

    fn rule(mut self, kind: K, pattern: impl IntoPattern, skip: bool) -> Self {
        self.rules.push(PendingRule {
            kind,
            pattern: pattern.into_pattern(),
            skip,
            mode: self.current_mode,
            action: None,
        });
        self
    }

    fn with_action(mut self, action: PendingAction) -> Self {
        match self.rules.last_mut() {
            Some(rule) => rule.action = Some(action),
            None => self.misplaced_action = true,
        }
        self
    }
}

impl<K: std::fmt::Debug> RuleSetBuilder<K> {
    /// 编译每个模式的 NFA
    ///
    /// 可以匹配空串的规则是允许的，扫描时零长度匹配永远不会被接受。
    pub fn build(self) -> Result<RuleSet<K>, RuleError> {
        if self.misplaced_action {
            return Err(RuleError::ActionWithoutRule);
        }
        if self.rules.is_empty() {
            return Err(RuleError::Empty);
        }

        let mut fragments = HashMap::new();
        for (name, pattern) in self.fragments {
            let pattern = pattern.map_err(|source| RuleError::InvalidPattern {
                name: name.clone(),
                source,
            })?;
            if fragments.contains_key(&name) {
                return Err(RuleError::DuplicateFragment(name));
            }
            fragments.insert(name, pattern);
        }
        check_fragments(&fragments)?;

        let mut rules = Vec::with_capacity(self.rules.len());
        for pending in self.rules {
            let pattern = pending.pattern.map_err(|source| RuleError::InvalidPattern {
                name: format!("{:?}", pending.kind),
                source,
            })?;
            if let Some(name) = pattern
                .fragment_refs()
                .into_iter()
                .find(|name| !fragments.contains_key(*name))
            {
                return Err(RuleError::UndefinedFragment(name.to_string()));
            }
            let action = match pending.action {
                None => None,
                Some(PendingAction::Pop) => Some(ModeAction::Pop),
                Some(PendingAction::Push(name)) => match self.modes.iter().position(|m| *m == name) {
                    Some(id) => Some(ModeAction::Push(id)),
                    None => return Err(RuleError::UnknownMode(name)),
                },
            };
            rules.push(Rule {
                kind: pending.kind,
                pattern,
                skip: pending.skip,
                mode: pending.mode,
                action,
            });
        }

        let mut modes = Vec::with_capacity(self.modes.len());
        for (id, name) in self.modes.iter().enumerate() {
            let mut nfa = Nfa::new();
            let mut members = Vec::new();
            for (index, rule) in rules.iter().enumerate().filter(|(_, r)| r.mode == id) {
                nfa.add_rule(index, &rule.pattern, &fragments)?;
                members.push(index);
            }
            debug!(
                target: "spgen::grammar",
                mode = %name,
                rules = members.len(),
                nfa_states = nfa.state_count(),
                "Compiled lexer mode"
            );
            modes.push(LexerMode {
                name: name.clone(),
                rules: members,
                nfa,
            });
        }

        Ok(RuleSet {
            rules,
            modes,
            mode_names: self.modes.into(),
            fragments,
        })
    }
}

impl<K> Default for RuleSetBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// 检查 fragment 引用无环且都已定义
fn check_fragments(fragments: &HashMap<String, Pattern>) -> Result<(), RuleError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        name: &'a str,
        fragments: &'a HashMap<String, Pattern>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Result<(), RuleError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(RuleError::RecursiveFragment(name.to_string())),
            None => {}
        }
        let pattern = fragments
            .get(name)
            .ok_or_else(|| RuleError::UndefinedFragment(name.to_string()))?;
        marks.insert(name, Mark::Visiting);
        for reference in pattern.fragment_refs() {
            visit(reference, fragments, marks)?;
        }
        marks.insert(name, Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut names: Vec<&String> = fragments.keys().collect();
    names.sort();
    for name in names {
        visit(name, fragments, &mut marks)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::pattern::CharClass;

    #[test]
    fn test_build_simple_rule_set() {
        let rules = RuleSet::builder()
            .fragment("digit", Pattern::class(CharClass::Digit))
            .token("Integer", "digit+")
            .skip("Whitespace", "'\\s'+")
            .build()
            .unwrap();

        assert_eq!(rules.rules().len(), 2);
        assert!(rules.rules()[1].skip);
        assert_eq!(rules.modes().len(), 1);
        assert_eq!(rules.mode_id(DEFAULT_MODE), Some(0));
        assert!(rules.fragment("digit").is_some());
    }

    #[test]
    fn test_build_empty_rule_set() {
        let result = RuleSetBuilder::<&str>::new().fragment("a", "'a'").build();
        assert_eq!(result.unwrap_err(), RuleError::Empty);
    }

    #[test]
    fn test_build_undefined_fragment() {
        let result = RuleSet::builder().token("Number", "digit+").build();
        assert_eq!(
            result.unwrap_err(),
            RuleError::UndefinedFragment("digit".to_string())
        );
    }

    #[test]
    fn test_build_recursive_fragment() {
        let result = RuleSet::builder()
            .fragment("a", "'x' b")
            .fragment("b", "a?")
            .token("T", "a")
            .build();
        assert!(matches!(result, Err(RuleError::RecursiveFragment(_))));
    }

    #[test]
    fn test_build_duplicate_fragment() {
        let result = RuleSet::builder()
            .fragment("a", "'x'")
            .fragment("a", "'y'")
            .token("T", "a")
            .build();
        assert_eq!(
            result.unwrap_err(),
            RuleError::DuplicateFragment("a".to_string())
        );
    }

    #[test]
    fn test_build_accepts_nullable_rule() {
        let rules = RuleSet::builder().token("Spaces", "' '*").build().unwrap();
        assert_eq!(rules.rules().len(), 1);
    }

    #[test]
    fn test_build_invalid_pattern() {
        let result = RuleSet::builder().token("Bad", r"'\q'").build();
        assert!(matches!(
            result,
            Err(RuleError::InvalidPattern {
                source: PatternError::UnknownEscape { ch: 'q', .. },
                ..
            })
        ));
    }

    #[test]
    fn test_build_modes_and_actions() {
        let rules = RuleSet::builder()
            .token("Open", "'{'")
            .push_mode("Inner")
            .token("Text", "[a-z]+")
            .mode("Inner")
            .token("Close", "'}'")
            .pop_mode()
            .token("Digits", "[0-9]+")
            .build()
            .unwrap();

        let inner = rules.mode_id("Inner").unwrap();
        assert_eq!(rules.rules()[0].action, Some(ModeAction::Push(inner)));
        assert_eq!(rules.rules()[2].action, Some(ModeAction::Pop));
        assert_eq!(rules.mode(inner).unwrap().rules, vec![2, 3]);
        assert_eq!(rules.mode(0).unwrap().rules, vec![0, 1]);
        assert_eq!(&*rules.mode_names(), &["default".to_string(), "Inner".to_string()]);
    }

    #[test]
    fn test_build_unknown_mode() {
        let result = RuleSet::builder()
            .token("Open", "'{'")
            .push_mode("Nowhere")
            .build();
        assert_eq!(
            result.unwrap_err(),
            RuleError::UnknownMode("Nowhere".to_string())
        );
    }

    #[test]
    fn test_build_action_without_rule() {
        let result = RuleSetBuilder::<&str>::new()
            .pop_mode()
            .token("A", "'a'")
            .build();
        assert_eq!(result.unwrap_err(), RuleError::ActionWithoutRule);
    }
}
