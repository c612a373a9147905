//! 规则自动机：规则编译为 NFA，扫描时通过惰性 DFA 缓存模拟

pub mod dfa;
pub mod nfa;

pub use dfa::{DfaCache, DfaStateId};
pub use nfa::{Nfa, StateId};
