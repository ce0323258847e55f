//! Ordered `.env` file model.
//!
//! Each service directory in an installation carries a `.env` file that
//! operators edit by hand. Reconciliation therefore has to be surgical:
//! a matching `KEY=` line is replaced in place, missing keys are appended
//! at the end, and every other line (comments, blanks, unrelated keys)
//! passes through verbatim. Values may be quoted and span multiple lines
//! (`KEY="a\nb"`), which a naive line-by-line scan would tear apart.

use crate::error::{OpsError, Result};
use crate::io;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static ENV_LINE_RE: OnceLock<Regex> = OnceLock::new();

/// Matches `KEY=value` or `KEY="value"` where a quoted value may span
/// newlines. Same shape as the pattern the original deployment scripts used.
fn env_line_re() -> &'static Regex {
    ENV_LINE_RE.get_or_init(|| {
        Regex::new(r#"(?m)^([A-Z_][A-Z0-9_]*)=(?:"([^"]*)"|([^\n]*))"#).unwrap()
    })
}

/// A requested change to a `.env` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvUpdate {
    /// Set `key` to a literal value.
    Value { key: String, value: String },
    /// Set `key` to the current value of `source` in the same file.
    Reference { key: String, source: String },
}

impl EnvUpdate {
    pub fn value(key: impl Into<String>, value: impl Into<String>) -> Self {
        EnvUpdate::Value {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn reference(key: impl Into<String>, source: impl Into<String>) -> Self {
        EnvUpdate::Reference {
            key: key.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Pair {
        key: String,
        value: String,
        quoted: bool,
    },
    /// Comment, blank line, or anything the assignment pattern didn't match.
    Raw(String),
}

/// Parsed `.env` content preserving line order.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    lines: Vec<Line>,
}

impl EnvFile {
    pub fn parse(content: &str) -> Self {
        let mut lines: Vec<Line> = Vec::new();
        let mut last = 0usize;

        for caps in env_line_re().captures_iter(content) {
            let whole = caps.get(0).unwrap();
            push_raw(&mut lines, &content[last..whole.start()]);
            let key = caps[1].to_string();

            if let Some(quoted) = caps.get(2) {
                // A quoted value must run to the end of its final physical
                // line; otherwise leave the raw line untouched rather than
                // reflowing it on render.
                let clean_end = content[whole.end()..]
                    .chars()
                    .next()
                    .is_none_or(|c| c == '\n' || c == '\r');
                if clean_end {
                    lines.push(Line::Pair {
                        key,
                        value: quoted.as_str().to_string(),
                        quoted: true,
                    });
                    last = whole.end();
                    continue;
                }
                let line_end = content[whole.start()..]
                    .find('\n')
                    .map(|i| whole.start() + i)
                    .unwrap_or(content.len());
                push_raw(&mut lines, &content[whole.start()..line_end]);
                last = line_end;
                continue;
            }

            lines.push(Line::Pair {
                key,
                value: caps[3].to_string(),
                quoted: false,
            });
            last = whole.end();
        }
        push_raw(&mut lines, &content[last..]);

        EnvFile { lines }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(OpsError::EnvFileNotFound(path.to_path_buf()));
        }
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        io::atomic_write(path, self.render().as_bytes())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Pair { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Pair { key, .. } => Some(key.as_str()),
            _ => None,
        })
    }

    /// Replace the first `key` assignment in place, or append one at the end.
    /// Values containing newlines are written quoted.
    pub fn set(&mut self, key: &str, value: &str) {
        let quoted = value.contains('\n');
        for line in &mut self.lines {
            if let Line::Pair {
                key: k,
                value: v,
                quoted: q,
            } = line
            {
                if k == key {
                    *v = value.to_string();
                    *q = quoted;
                    return;
                }
            }
        }
        self.lines.push(Line::Pair {
            key: key.to_string(),
            value: value.to_string(),
            quoted,
        });
    }

    /// Apply updates in order. A `Reference` to a key absent from the file
    /// is an error and leaves `self` partially updated; callers that need
    /// all-or-nothing semantics apply against a clone.
    pub fn apply(&mut self, updates: &[EnvUpdate]) -> Result<()> {
        for update in updates {
            match update {
                EnvUpdate::Value { key, value } => self.set(key, value),
                EnvUpdate::Reference { key, source } => {
                    let value = self
                        .get(source)
                        .ok_or_else(|| OpsError::EnvKeyNotFound(source.clone()))?
                        .to_string();
                    self.set(key, &value);
                }
            }
        }
        Ok(())
    }

    /// Serialize the file back to text. Every line, including the last,
    /// ends with `\n`, so a file missing its trailing newline gains one
    /// on save.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Pair { key, value, quoted } => {
                    if *quoted {
                        out.push_str(&format!("{key}=\"{value}\""));
                    } else {
                        out.push_str(&format!("{key}={value}"));
                    }
                }
                Line::Raw(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }
}

fn push_raw(lines: &mut Vec<Line>, segment: &str) {
    let mut segment = segment;
    // The newline that terminated the previous line is not content.
    if !lines.is_empty() {
        segment = segment.strip_prefix('\n').unwrap_or(segment);
    }
    if segment.is_empty() {
        return;
    }
    let trailing_newline = segment.ends_with('\n');
    let mut pieces: Vec<&str> = segment.split('\n').collect();
    if trailing_newline {
        pieces.pop();
    }
    for piece in pieces {
        lines.push(Line::Raw(piece.to_string()));
    }
}

/// Update variables in an existing `.env` file. Missing file is a hard error.
///
/// Applying the same updates twice produces identical output, and lines not
/// named in `updates` keep their order and content.
pub fn update_env_file(path: &Path, updates: &[EnvUpdate]) -> Result<()> {
    let mut env = EnvFile::load(path)?;
    env.apply(updates)?;
    env.save(path)
}

/// Read a single variable from a `.env` file. Returns `None` when the file
/// does not exist or the key is absent.
pub fn read_env_var(path: &Path, key: &str) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let env = EnvFile::load(path)?;
    Ok(env.get(key).map(|v| v.to_string()))
}
