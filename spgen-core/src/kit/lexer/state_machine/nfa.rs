//! Thompson NFA
//!
//! 一个模式的所有规则编译进同一个 NFA：起始状态经 ε 边连到每条规则的入口，
//! 每条规则的出口状态标记为接受该规则。

use std::collections::HashMap;

use crate::grammar::pattern::{CharClass, Pattern};
use crate::grammar::rules::RuleError;

pub type StateId = usize;

#[derive(Debug, Clone, Default)]
pub struct NfaState {
    /// 字符转移
    pub transitions: Vec<(CharClass, StateId)>,
    /// ε 转移
    pub epsilon: Vec<StateId>,
    /// 接受的规则下标
    pub accept: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Nfa {
    states: Vec<NfaState>,
    start: StateId,
}

impl Nfa {
    pub fn new() -> Self {
        Self {
            states: vec![NfaState::default()],
            start: 0,
        }
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn add_state(&mut self) -> StateId {
        let id = self.states.len();
        self.states.push(NfaState::default());
        id
    }

    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.states[from].epsilon.push(to);
    }

    pub fn add_transition(&mut self, from: StateId, class: CharClass, to: StateId) {
        self.states[from].transitions.push((class, to));
    }

    /// 编译一条规则并接到起始状态上
    ///
    /// 调用方保证 fragment 引用无环。返回该规则的入口状态。
    pub fn add_rule(
        &mut self,
        rule: usize,
        pattern: &Pattern,
        fragments: &HashMap<String, Pattern>,
    ) -> Result<StateId, RuleError> {
        let (entry, exit) = self.compile(pattern, fragments)?;
        self.states[exit].accept = Some(rule);
        let start = self.start;
        self.add_epsilon(start, entry);
        Ok(entry)
    }

    fn compile(
        &mut self,
        pattern: &Pattern,
        fragments: &HashMap<String, Pattern>,
    ) -> Result<(StateId, StateId), RuleError> {
        match pattern {
            Pattern::Literal(text) => {
                let entry = self.add_state();
                let mut current = entry;
                for c in text.chars() {
                    let next = self.add_state();
                    self.add_transition(current, CharClass::Char(c), next);
                    current = next;
                }
                Ok((entry, current))
            }
            Pattern::Class(class) => {
                let entry = self.add_state();
                let exit = self.add_state();
                self.add_transition(entry, class.clone(), exit);
                Ok((entry, exit))
            }
            Pattern::Sequence(items) => {
                let entry = self.add_state();
                let mut current = entry;
                for item in items {
                    let (item_entry, item_exit) = self.compile(item, fragments)?;
                    self.add_epsilon(current, item_entry);
                    current = item_exit;
                }
                Ok((entry, current))
            }
            Pattern::Choice(items) => {
                let entry = self.add_state();
                let exit = self.add_state();
                for item in items {
                    let (item_entry, item_exit) = self.compile(item, fragments)?;
                    self.add_epsilon(entry, item_entry);
                    self.add_epsilon(item_exit, exit);
                }
                Ok((entry, exit))
            }
            Pattern::ZeroOrMore(inner) => {
                let (entry, exit) = self.compile_repeat(inner, fragments)?;
                self.add_epsilon(entry, exit);
                Ok((entry, exit))
            }
            Pattern::OneOrMore(inner) => self.compile_repeat(inner, fragments),
            Pattern::Optional(inner) => {
                let entry = self.add_state();
                let exit = self.add_state();
                let (inner_entry, inner_exit) = self.compile(inner, fragments)?;
                self.add_epsilon(entry, inner_entry);
                self.add_epsilon(inner_exit, exit);
                self.add_epsilon(entry, exit);
                Ok((entry, exit))
            }
            Pattern::Fragment(name) => {
                let body = fragments
                    .get(name)
                    .ok_or_else(|| RuleError::UndefinedFragment(name.clone()))?;
                self.compile(body, fragments)
            }
        }
    }

    /// 至少一次的循环，`*` 在此基础上加一条跳过边
    fn compile_repeat(
        &mut self,
        inner: &Pattern,
        fragments: &HashMap<String, Pattern>,
    ) -> Result<(StateId, StateId), RuleError> {
        let entry = self.add_state();
        let exit = self.add_state();
        let (inner_entry, inner_exit) = self.compile(inner, fragments)?;
        self.add_epsilon(entry, inner_entry);
        self.add_epsilon(inner_exit, exit);
        self.add_epsilon(inner_exit, inner_entry);
        Ok((entry, exit))
    }

    /// ε 闭包，结果有序去重
    pub fn epsilon_closure(&self, mut set: Vec<StateId>) -> Vec<StateId> {
        let mut visited = vec![false; self.states.len()];
        let mut stack = std::mem::take(&mut set);
        while let Some(state) = stack.pop() {
            if visited[state] {
                continue;
            }
            visited[state] = true;
            set.push(state);
            stack.extend(self.states[state].epsilon.iter().copied());
        }
        set.sort_unstable();
        set
    }

    /// 起始状态集
    pub fn start_set(&self) -> Vec<StateId> {
        self.epsilon_closure(vec![self.start])
    }

    /// 消费字符 `c` 后的状态集（已做 ε 闭包）
    pub fn step(&self, set: &[StateId], c: char) -> Vec<StateId> {
        let moved: Vec<StateId> = set
            .iter()
            .flat_map(|&s| self.states[s].transitions.iter())
            .filter(|(class, _)| class.matches(c))
            .map(|&(_, to)| to)
            .collect();
        if moved.is_empty() {
            return moved;
        }
        self.epsilon_closure(moved)
    }

    /// 状态集中优先级最高（下标最小）的接受规则
    pub fn accepting_rule(&self, set: &[StateId]) -> Option<usize> {
        set.iter().filter_map(|&s| self.states[s].accept).min()
    }
}

impl Default for Nfa {
    fn default() -> Self {
        Self::new()
    }
}
