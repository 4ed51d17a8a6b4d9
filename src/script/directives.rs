// src/script/directives.rs

//! Bootstrap directive extraction.
//!
//! Plugin and repository declarations live inside the build script, yet they
//! must be known before the script itself can be compiled. This module pulls
//! just those calls out of the raw text by counting parentheses, without
//! parsing anything else.
//!
//! Known limitation: a directive keyword inside a comment or string literal
//! is treated like a real call, and parentheses inside string literals
//! affect the depth counter.

use std::fmt;

use anyhow::Result;

use crate::errors::BuilddagError;
use crate::fs::FileSystem;
use crate::script::ScriptSource;

/// Opening token of the "declare plugins" call.
pub const PLUGINS_DIRECTIVE: &str = "plugins(";
/// Opening token of the "declare repositories" call.
pub const REPOS_DIRECTIVE: &str = "repos(";

/// Imports prepended to the extracted snippet so both directive calls resolve
/// without the rest of the script.
pub const DIRECTIVE_HEADERS: &[&str] = &[
    "import builddag.api.plugins",
    "import builddag.api.repos",
];

/// Which of the two recognised directives a call is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Plugins,
    Repos,
}

impl DirectiveKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::Plugins => PLUGINS_DIRECTIVE,
            DirectiveKind::Repos => REPOS_DIRECTIVE,
        }
    }

    fn name(self) -> &'static str {
        match self {
            DirectiveKind::Plugins => "plugins",
            DirectiveKind::Repos => "repos",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Line-oriented paren-depth scanner.
///
/// The depth carries over between lines, so a call whose argument list spans
/// several physical lines keeps every one of them.
#[derive(Debug, Default)]
pub struct DirectiveScanner {
    depth: i64,
}

impl DirectiveScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current carried-over paren depth.
    pub fn depth(&self) -> i64 {
        self.depth
    }

    /// Feed one line; returns `true` if the line belongs to the snippet.
    ///
    /// A line is kept when the depth is positive on entry, or becomes
    /// positive at any point while scanning it. Lines that neither contain a
    /// directive keyword nor continue an open call leave the depth untouched.
    pub fn feed(&mut self, line: &str) -> bool {
        let capturing = self.depth > 0
            || line.contains(PLUGINS_DIRECTIVE)
            || line.contains(REPOS_DIRECTIVE);
        if !capturing {
            return false;
        }

        let mut keep = self.depth > 0;
        for ch in line.chars() {
            match ch {
                '(' => self.depth += 1,
                ')' => self.depth -= 1,
                _ => continue,
            }
            if self.depth > 0 {
                keep = true;
            }
        }

        // Stray closing parens must not poison the following lines.
        if self.depth < 0 {
            self.depth = 0;
        }
        keep
    }
}

/// A directive call reconstructed from the extracted snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveCall {
    pub kind: DirectiveKind,
    /// Arguments as written, trimmed, including any quotes.
    pub raw_arguments: Vec<String>,
}

impl DirectiveCall {
    /// Argument list normalised to `a, b, c` form.
    pub fn argument_list(&self) -> String {
        self.raw_arguments.join(", ")
    }

    /// Arguments with surrounding double quotes removed.
    pub fn values(&self) -> Vec<String> {
        self.raw_arguments
            .iter()
            .map(|a| {
                a.strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(a)
                    .to_string()
            })
            .collect()
    }
}

/// Verbatim directive lines extracted from one script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDirectives {
    lines: Vec<String>,
}

impl ExtractedDirectives {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The extracted lines joined back together.
    pub fn snippet(&self) -> String {
        self.lines.join("\n")
    }

    /// Snippet wrapped with [`DIRECTIVE_HEADERS`], ready to be compiled as
    /// the bootstrap source.
    pub fn bootstrap_source(&self) -> String {
        let mut out = String::new();
        for header in DIRECTIVE_HEADERS {
            out.push_str(header);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.snippet());
        out.push('\n');
        out
    }

    /// Reconstruct the individual directive calls in the snippet.
    pub fn calls(&self) -> Vec<DirectiveCall> {
        let text = self.snippet();
        let mut calls = Vec::new();
        let mut offset = 0;

        while let Some((start, kind)) = next_keyword(&text[offset..]) {
            let args_start = offset + start + kind.keyword().len();
            let Some(args_len) = matching_close(&text[args_start..]) else {
                break;
            };
            let inner = &text[args_start..args_start + args_len];
            calls.push(DirectiveCall {
                kind,
                raw_arguments: split_arguments(inner),
            });
            offset = args_start + args_len + 1;
        }

        calls
    }

    /// Reject directive calls that declare nothing, e.g. `plugins()`.
    pub fn validate(&self) -> crate::errors::Result<()> {
        for call in self.calls() {
            if call.values().iter().all(|v| v.trim().is_empty()) {
                return Err(BuilddagError::MissingDirectiveTarget(call.kind.to_string()));
            }
        }
        Ok(())
    }
}

fn next_keyword(text: &str) -> Option<(usize, DirectiveKind)> {
    let plugins = text.find(PLUGINS_DIRECTIVE).map(|i| (i, DirectiveKind::Plugins));
    let repos = text.find(REPOS_DIRECTIVE).map(|i| (i, DirectiveKind::Repos));
    match (plugins, repos) {
        (Some(p), Some(r)) => Some(if p.0 <= r.0 { p } else { r }),
        (p, r) => p.or(r),
    }
}

/// Byte length up to the paren that closes an already opened call.
fn matching_close(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_string = false;
    for (i, ch) in text.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_arguments(inner: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;

    for ch in inner.chars() {
        match ch {
            '"' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth = depth.saturating_sub(1),
            ',' if !in_string && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    let last = current.trim();
    if !last.is_empty() || !args.is_empty() {
        args.push(last.to_string());
    }
    args
}

/// Extract directive lines from raw script text.
pub fn extract_directives(content: &str) -> ExtractedDirectives {
    let mut scanner = DirectiveScanner::new();
    let lines = content
        .lines()
        .filter(|line| scanner.feed(line))
        .map(|line| line.to_string())
        .collect();
    ExtractedDirectives { lines }
}

/// Read `source` and extract its directive lines.
pub fn extract_from_source(fs: &dyn FileSystem, source: &ScriptSource) -> Result<ExtractedDirectives> {
    let content = fs.read_to_string(source.path())?;
    Ok(extract_directives(&content))
}
