pub mod commands;
pub mod eval;
pub mod exec;
pub mod tokens;
pub mod vars;

use std::io::BufRead;

use anyhow::{Context as AnyhowContext, Result};
use chumsky::prelude::{choice, just, none_of};
use chumsky::{IterParser, Parser};

use crate::parser::exec::Interpreter;

/// Reads every line from `reader` and runs them as one script.
pub fn exec(reader: &mut dyn BufRead, interp: &mut Interpreter) -> Result<()> {
    let mut lines = Vec::new();
    for line in reader.split(b'\n') {
        let line = line.with_context(|| "No se pudo leer el script")?;
        lines.push(decode_line(&line));
    }
    interp.run(&lines);
    Ok(())
}

/// Scripts and books written by other editors may not be UTF-8; bad bytes
/// become U+FFFD instead of stopping the read.
pub fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

pub fn trim(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '\t' || c == '\r')
}

/// Drops everything from the first `#` that is not inside double quotes.
pub fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return trim(&line[..i]),
            _ => {}
        }
    }
    trim(line)
}

pub fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}

pub fn is_bracketed(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('[') && s.ends_with(']')
}

/// Strips exactly one layer of surrounding double quotes.
pub fn unquote(s: &str) -> &str {
    if is_quoted(s) {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Tracks whether a byte position sits inside quotes or parentheses.
#[derive(Default)]
struct Nesting {
    in_quotes: bool,
    depth: i32,
}

impl Nesting {
    fn top_level(&self) -> bool {
        !self.in_quotes && self.depth == 0
    }

    fn feed(&mut self, bytes: &[u8], i: usize) {
        match bytes[i] {
            b'"' if i == 0 || bytes[i - 1] != b'\\' => self.in_quotes = !self.in_quotes,
            b'(' if !self.in_quotes => self.depth += 1,
            b')' if !self.in_quotes => self.depth -= 1,
            _ => {}
        }
    }
}

/// Splits an expression on top-level `" + "` and `", "` separators.
pub fn split_parts(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let mut nesting = Nesting::default();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if nesting.top_level() {
            if bytes[i] == b' ' && expr[i..].starts_with(" + ") {
                parts.push(trim(&expr[start..i]));
                i += 3;
                start = i;
                continue;
            }
            if bytes[i] == b',' && bytes.get(i + 1) == Some(&b' ') {
                parts.push(trim(&expr[start..i]));
                i += 2;
                start = i;
                continue;
            }
        }
        nesting.feed(bytes, i);
        i += 1;
    }
    parts.push(trim(&expr[start..]));
    parts
}

/// Splits a parameter or argument list on top-level commas.
pub fn split_args(list: &str) -> Vec<&str> {
    let list = trim(list);
    if list.is_empty() {
        return Vec::new();
    }
    let bytes = list.as_bytes();
    let mut nesting = Nesting::default();
    let mut args = Vec::new();
    let mut start = 0;
    for i in 0..bytes.len() {
        if bytes[i] == b',' && nesting.top_level() {
            args.push(trim(&list[start..i]));
            start = i + 1;
            continue;
        }
        nesting.feed(bytes, i);
    }
    let last = trim(&list[start..]);
    if !last.is_empty() {
        args.push(last);
    }
    args
}

/// Leftmost top-level occurrence of any of `patterns`. Earlier patterns win ties.
pub fn find_top_level<'p>(expr: &str, patterns: &[&'p str]) -> Option<(usize, &'p str)> {
    let bytes = expr.as_bytes();
    let mut nesting = Nesting::default();
    for i in 0..bytes.len() {
        if nesting.top_level() {
            for pattern in patterns {
                if bytes[i..].starts_with(pattern.as_bytes()) {
                    return Some((i, *pattern));
                }
            }
        }
        nesting.feed(bytes, i);
    }
    None
}

/// Returns the argument text of `name(...)` when the whole expression is that one call.
pub fn call_args<'a>(expr: &'a str, name: &str) -> Option<&'a str> {
    let rest = expr.strip_prefix(name)?.strip_prefix('(')?;
    let bytes = rest.as_bytes();
    let mut nesting = Nesting::default();
    for i in 0..bytes.len() {
        if bytes[i] == b')' && nesting.top_level() {
            return if i == bytes.len() - 1 {
                Some(&rest[..i])
            } else {
                None
            };
        }
        nesting.feed(bytes, i);
    }
    None
}

fn list_items<'a>() -> impl Parser<'a, &'a str, Vec<&'a str>, chumsky::extra::Default> {
    let quoted = just('"')
        .then(none_of("\"").repeated())
        .then(just('"'))
        .ignored();
    let bare = none_of(",\"").ignored();

    choice((quoted, bare))
        .repeated()
        .to_slice()
        .separated_by(just(','))
        .collect()
}

/// Items of a `[a, b, c]` literal, trimmed but still quoted.
///
/// Commas inside quoted items do not split. Unbalanced quotes fall back to a
/// plain comma split.
pub fn parse_list(literal: &str) -> Vec<String> {
    let literal = trim(literal);
    if !is_bracketed(literal) {
        return Vec::new();
    }
    let content = &literal[1..literal.len() - 1];
    if trim(content).is_empty() {
        return Vec::new();
    }
    let raw: Vec<&str> = match list_items().parse(content).into_result() {
        Ok(items) => items,
        Err(_) => content.split(',').collect(),
    };
    let mut items: Vec<String> = raw.into_iter().map(|s| trim(s).to_string()).collect();
    if items.last().map_or(false, |s| s.is_empty()) {
        items.pop();
    }
    items
}
