//! 字符源抽象
//!
//! 统一文件和内存文本两种输入，对外提供字符级的预读、消费和位置追踪。
//! 文件源按块读取并增量解码 UTF-8，不会把整个文件读入内存。

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::position::SourcePosition;
use crate::kit::lexer::error::SourceError;

/// 默认读取块大小
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Unicode 替换字符（非法 UTF-8 时使用）
const REPLACEMENT_CHAR: char = '\u{FFFD}';

enum Backing {
    Text {
        chars: Vec<char>,
        index: usize,
    },
    File {
        path: PathBuf,
        reader: BufReader<File>,
        /// 已解码但尚未消费的字符及其在文件中占用的字节数
        lookahead: VecDeque<(char, usize)>,
        /// 已解码的字节数（下一次解码的起始偏移）
        decoded: usize,
        /// 底层字节已读完
        eof: bool,
    },
}

/// 字符源
///
/// 所有读取操作都可能失败（文件 IO），因此返回 `Result`。
pub struct SourceBuffer {
    backing: Backing,
    position: SourcePosition,
}

impl SourceBuffer {
    /// 从内存文本创建
    pub fn from_text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self {
            backing: Backing::Text {
                chars: text.chars().collect(),
                index: 0,
            },
            position: SourcePosition::start(),
        }
    }

    /// 打开文件作为字符源
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Self::from_file_with_chunk_size(path, DEFAULT_CHUNK_SIZE)
    }

    /// 打开文件，指定每次读取的字节数
    pub fn from_file_with_chunk_size(
        path: impl AsRef<Path>,
        chunk_size: usize,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SourceError::from_io(path, &e))?;
        debug!(target: "spgen::source", path = %path.display(), chunk_size, "Opened source file");

        Ok(Self {
            backing: Backing::File {
                path: path.to_path_buf(),
                reader: BufReader::with_capacity(chunk_size.max(1), file),
                lookahead: VecDeque::new(),
                decoded: 0,
                eof: false,
            },
            position: SourcePosition::start(),
        })
    }

    /// 源名称：文件路径或 `<text>`
    pub fn name(&self) -> String {
        match &self.backing {
            Backing::Text { .. } => "<text>".to_string(),
            Backing::File { path, .. } => path.display().to_string(),
        }
    }

    /// 当前位置（下一个未消费字符的位置）
    pub fn current_position(&self) -> SourcePosition {
        self.position
    }

    /// 预读当前字符（不消费）
    pub fn peek_char(&mut self) -> Result<Option<char>, SourceError> {
        self.peek_nth(0)
    }

    /// 预读第 n 个字符（0 为当前字符，不消费）
    pub fn peek_nth(&mut self, n: usize) -> Result<Option<char>, SourceError> {
        match &mut self.backing {
            Backing::Text { chars, index } => Ok(chars.get(*index + n).copied()),
            Backing::File {
                path,
                reader,
                lookahead,
                decoded,
                eof,
            } => {
                while lookahead.len() <= n && !*eof {
                    match decode_char(reader, path, *decoded)? {
                        Some((c, len)) => {
                            *decoded += len;
                            lookahead.push_back((c, len));
                        }
                        None => *eof = true,
                    }
                }
                Ok(lookahead.get(n).map(|&(c, _)| c))
            }
        }
    }

    /// 消费并返回当前字符
    pub fn next_char(&mut self) -> Result<Option<char>, SourceError> {
        let c = self.peek_nth(0)?;
        if let Some(c) = c {
            let len = match &mut self.backing {
                Backing::Text { index, .. } => {
                    *index += 1;
                    c.len_utf8()
                }
                Backing::File { lookahead, .. } => lookahead
                    .pop_front()
                    .map_or(c.len_utf8(), |(_, len)| len),
            };
            self.position.advance_by(c, len);
        }
        Ok(c)
    }

    /// 是否已到达输入末尾
    pub fn at_end(&mut self) -> Result<bool, SourceError> {
        Ok(self.peek_nth(0)?.is_none())
    }

    /// 回到输入开头
    pub fn rewind(&mut self) -> Result<(), SourceError> {
        match &mut self.backing {
            Backing::Text { index, .. } => *index = 0,
            Backing::File {
                path,
                reader,
                lookahead,
                decoded,
                eof,
            } => {
                reader.rewind().map_err(|e| SourceError::from_io(path, &e))?;
                lookahead.clear();
                *decoded = 0;
                *eof = false;
            }
        }
        self.position = SourcePosition::start();
        Ok(())
    }
}

/// 预读一个字节（不消费）
fn peek_byte(reader: &mut BufReader<File>, path: &Path) -> Result<Option<u8>, SourceError> {
    let buf = reader.fill_buf().map_err(|e| SourceError::from_io(path, &e))?;
    Ok(buf.first().copied())
}

/// 从 reader 解码下一个字符，返回字符和实际读取的字节数
///
/// 非法首字节、缺失的续字节、截断的序列都解码为 U+FFFD 并记录警告。
/// 非续字节不会被吞掉，留给下一次解码。`offset` 为首字节在文件中的偏移。
fn decode_char(
    reader: &mut BufReader<File>,
    path: &Path,
    offset: usize,
) -> Result<Option<(char, usize)>, SourceError> {
    let lead = match peek_byte(reader, path)? {
        Some(b) => b,
        None => return Ok(None),
    };
    reader.consume(1);

    let seq_len = match utf8_sequence_length(lead) {
        Some(len) => len,
        None => {
            warn!(
                target: "spgen::source",
                "Invalid UTF-8 lead byte: 0x{:02X} at byte {}", lead, offset
            );
            return Ok(Some((REPLACEMENT_CHAR, 1)));
        }
    };

    let mut bytes = [lead, 0, 0, 0];
    for read in 1..seq_len {
        match peek_byte(reader, path)? {
            Some(b) if b & 0xC0 == 0x80 => {
                reader.consume(1);
                bytes[read] = b;
            }
            Some(b) => {
                warn!(
                    target: "spgen::source",
                    "Invalid UTF-8 continuation byte: 0x{:02X} at byte {}", b, offset + read
                );
                return Ok(Some((REPLACEMENT_CHAR, read)));
            }
            None => {
                warn!(
                    target: "spgen::source",
                    "Incomplete UTF-8 sequence at EOF: expected {} bytes at byte {}", seq_len, offset
                );
                return Ok(Some((REPLACEMENT_CHAR, read)));
            }
        }
    }

    match std::str::from_utf8(&bytes[..seq_len]) {
        Ok(s) => Ok(Some((s.chars().next().unwrap_or(REPLACEMENT_CHAR), seq_len))),
        Err(e) => {
            warn!(
                target: "spgen::source",
                "UTF-8 decode error for bytes {:02X?}: {} at byte {}", &bytes[..seq_len], e, offset
            );
            Ok(Some((REPLACEMENT_CHAR, seq_len)))
        }
    }
}

/// 获取UTF-8序列长度
fn utf8_sequence_length(lead_byte: u8) -> Option<usize> {
    match lead_byte {
        0x00..=0x7F => Some(1),
        0xC0..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF7 => Some(4),
        _ => None, // 续字节或超出范围
    }
}
