//! Token 结构

use serde::Serialize;

use super::core::{SourcePosition, SourceSpan};

/// 一个已识别的 token
///
/// `kind` 来自生成器定义的开放集合，引擎不关心其具体类型。
/// 值类型，按值交给 listener。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TokenInfo<K> {
    pub kind: K,
    /// 原始文本
    pub lexeme: String,
    pub span: SourceSpan,
}

impl<K> TokenInfo<K> {
    pub fn new(kind: K, lexeme: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// 获取 token 的起始位置
    pub fn start(&self) -> SourcePosition {
        self.span.start
    }

    /// 获取 token 的结束位置
    pub fn end(&self) -> SourcePosition {
        self.span.end
    }

    /// 将 token 类型映射为另一种类型
    pub fn map_kind<U, F>(self, f: F) -> TokenInfo<U>
    where
        F: FnOnce(K) -> U,
    {
        TokenInfo {
            kind: f(self.kind),
            lexeme: self.lexeme,
            span: self.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_accessors() {
        let start = SourcePosition::new(0, 1, 1);
        let end = SourcePosition::new(3, 1, 4);
        let token = TokenInfo::new("Identifier", "abc", SourceSpan::range(start, end));

        assert_eq!(token.start(), start);
        assert_eq!(token.end(), end);
        assert_eq!(token.span.len(), token.lexeme.len());
    }

    #[test]
    fn test_token_serializes_with_span() {
        let start = SourcePosition::new(3, 2, 1);
        let end = SourcePosition::new(5, 2, 3);
        let token = TokenInfo::new("Integer", "42", SourceSpan::range(start, end));
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["kind"], "Integer");
        assert_eq!(json["lexeme"], "42");
        assert_eq!(json["span"]["start"]["line"], 2);
        assert_eq!(json["span"]["end"]["offset"], 5);
    }

    #[test]
    fn test_token_map_kind() {
        let span = SourceSpan::at(SourcePosition::start());
        let token = TokenInfo::new(1u8, "x", span).map_kind(|k| k as u32 * 10);
        assert_eq!(token.kind, 10u32);
        assert_eq!(token.lexeme, "x");
    }
}
