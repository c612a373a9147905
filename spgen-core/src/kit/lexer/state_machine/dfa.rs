//! 惰性 DFA
//!
//! 子集构造按需进行：只有扫描真正走到的 (状态, 字符) 才会计算并缓存。
//! 字符集是完整的 Unicode，预先构造整张转移表不现实。

use std::collections::HashMap;

use tracing::trace;

use super::nfa::{Nfa, StateId};

pub type DfaStateId = usize;

#[derive(Debug, Clone)]
struct DfaState {
    nfa_states: Vec<StateId>,
    accept: Option<usize>,
    /// None 表示死状态
    transitions: HashMap<char, Option<DfaStateId>>,
}

/// 单个模式的 DFA 缓存，每个处理器各自持有
#[derive(Debug, Clone)]
pub struct DfaCache {
    states: Vec<DfaState>,
    index: HashMap<Vec<StateId>, DfaStateId>,
    start: DfaStateId,
}

impl DfaCache {
    pub fn new(nfa: &Nfa) -> Self {
        let mut cache = Self {
            states: Vec::new(),
            index: HashMap::new(),
            start: 0,
        };
        cache.start = cache.intern(nfa, nfa.start_set());
        cache
    }

    pub fn start(&self) -> DfaStateId {
        self.start
    }

    /// 接受的规则下标
    pub fn accept(&self, state: DfaStateId) -> Option<usize> {
        self.states[state].accept
    }

    /// 已构造的 DFA 状态数
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// 转移；None 表示没有规则能继续匹配
    pub fn next(&mut self, nfa: &Nfa, state: DfaStateId, c: char) -> Option<DfaStateId> {
        if let Some(cached) = self.states[state].transitions.get(&c) {
            return *cached;
        }
        let target = nfa.step(&self.states[state].nfa_states, c);
        let next = if target.is_empty() {
            None
        } else {
            Some(self.intern(nfa, target))
        };
        self.states[state].transitions.insert(c, next);
        next
    }

    /// 当前模式是否有规则能以 `c` 开头
    pub fn can_start(&mut self, nfa: &Nfa, c: char) -> bool {
        let start = self.start;
        self.next(nfa, start, c).is_some()
    }

    fn intern(&mut self, nfa: &Nfa, set: Vec<StateId>) -> DfaStateId {
        if let Some(&id) = self.index.get(&set) {
            return id;
        }
        let id = self.states.len();
        let accept = nfa.accepting_rule(&set);
        trace!(
            target: "spgen::scanner",
            dfa_state = id,
            nfa_states = set.len(),
            ?accept,
            "New DFA state"
        );
        self.index.insert(set.clone(), id);
        self.states.push(DfaState {
            nfa_states: set,
            accept,
            transitions: HashMap::new(),
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::pattern::Pattern;

    fn nfa_for(patterns: &[&str]) -> Nfa {
        let mut nfa = Nfa::new();
        for (i, p) in patterns.iter().enumerate() {
            nfa.add_rule(i, &Pattern::parse(p).unwrap(), &HashMap::new())
                .unwrap();
        }
        nfa
    }

    #[test]
    fn test_dfa_longest_match_states() {
        let nfa = nfa_for(&["'='", "'=='"]);
        let mut dfa = DfaCache::new(&nfa);

        let s1 = dfa.next(&nfa, dfa.start(), '=').unwrap();
        assert_eq!(dfa.accept(s1), Some(0));
        let s2 = dfa.next(&nfa, s1, '=').unwrap();
        assert_eq!(dfa.accept(s2), Some(1));
        assert_eq!(dfa.next(&nfa, s2, '='), None);
    }

    #[test]
    fn test_dfa_caches_transitions() {
        let nfa = nfa_for(&["[a-z]+"]);
        let mut dfa = DfaCache::new(&nfa);

        let a = dfa.next(&nfa, dfa.start(), 'a').unwrap();
        let count = dfa.state_count();
        let b = dfa.next(&nfa, a, 'b').unwrap();
        // 同一个 NFA 状态集只对应一个 DFA 状态
        assert_eq!(a, b);
        assert_eq!(dfa.state_count(), count);
    }

    #[test]
    fn test_dfa_can_start() {
        let nfa = nfa_for(&["[0-9]+", "'!='"]);
        let mut dfa = DfaCache::new(&nfa);
        assert!(dfa.can_start(&nfa, '7'));
        assert!(dfa.can_start(&nfa, '!'));
        assert!(!dfa.can_start(&nfa, '@'));
        assert_eq!(dfa.accept(dfa.start()), None);
    }
}
