//! Identity declarations embedded in firmware source.
//!
//! The firmware's `main.cpp` is authoritative for its version and board identity:
//!
//! ```text
//! #define FIRMWARE_VERSION "1.0.1"
//! #define BOARD_MODEL "ATtiny1616"
//! #define BOARD_DESCRIPTION "I2C Light Controller"
//! ```
//!
//! Lines are tokenized by hand rather than pattern-matched so that a missing or
//! misspelled declaration is reported by name instead of silently not matching.

use crate::{PackageError, PackageResult};
use std::ops::Range;
use tracing::debug;

const DEFINE_KEYWORD: &str = "#define";

/// One of the required identity declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Declaration {
    Version,
    BoardModel,
    BoardDescription,
}

impl Declaration {
    /// All required declarations, in extraction order.
    pub const ALL: [Self; 3] = [Self::Version, Self::BoardModel, Self::BoardDescription];

    /// The macro name as written in source (e.g., `BOARD_MODEL`).
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Version => "FIRMWARE_VERSION",
            Self::BoardModel => "BOARD_MODEL",
            Self::BoardDescription => "BOARD_DESCRIPTION",
        }
    }

    /// The declaration-set key (e.g., `board_model`).
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::BoardModel => "board_model",
            Self::BoardDescription => "board_description",
        }
    }
}

/// The complete set of identity values extracted from source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSet {
    pub version: String,
    pub board_model: String,
    pub board_description: String,
}

impl DeclarationSet {
    /// Look up a value by declaration.
    #[must_use]
    pub fn get(&self, declaration: Declaration) -> &str {
        match declaration {
            Declaration::Version => &self.version,
            Declaration::BoardModel => &self.board_model,
            Declaration::BoardDescription => &self.board_description,
        }
    }
}

/// A `#define NAME "value"` occurrence, with the value's byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Define<'a> {
    name: &'a str,
    value: &'a str,
    value_span: Range<usize>,
}

/// Extract all three identity declarations from source text.
///
/// The first occurrence of each identifier wins. Fails with
/// [`PackageError::MissingDeclaration`] naming the first identifier that has no
/// match; a partial set is never returned.
pub fn extract(source: &str) -> PackageResult<DeclarationSet> {
    let defines = scan_defines(source);

    Ok(DeclarationSet {
        version: lookup(&defines, Declaration::Version)?,
        board_model: lookup(&defines, Declaration::BoardModel)?,
        board_description: lookup(&defines, Declaration::BoardDescription)?,
    })
}

/// Extract a single declaration, ignoring whether the others are present.
pub fn find(source: &str, declaration: Declaration) -> PackageResult<String> {
    lookup(&scan_defines(source), declaration)
}

/// Replace the quoted value of every occurrence of `declaration` with `new_value`.
///
/// All other text, including spacing inside the matched lines, is left byte-identical.
pub fn rewrite(source: &str, declaration: Declaration, new_value: &str) -> PackageResult<String> {
    let spans: Vec<Range<usize>> = scan_defines(source)
        .into_iter()
        .filter(|d| d.name == declaration.identifier())
        .map(|d| d.value_span)
        .collect();

    if spans.is_empty() {
        return Err(PackageError::MissingDeclaration(
            declaration.identifier().to_string(),
        ));
    }

    let mut rewritten = String::with_capacity(source.len());
    let mut cursor = 0;
    for span in spans {
        rewritten.push_str(&source[cursor..span.start]);
        rewritten.push_str(new_value);
        cursor = span.end;
    }
    rewritten.push_str(&source[cursor..]);

    Ok(rewritten)
}

fn lookup(defines: &[Define<'_>], declaration: Declaration) -> PackageResult<String> {
    let define = defines
        .iter()
        .find(|d| d.name == declaration.identifier())
        .ok_or_else(|| PackageError::MissingDeclaration(declaration.identifier().to_string()))?;
    debug!(
        identifier = declaration.identifier(),
        value = define.value,
        "found declaration"
    );
    Ok(define.value.to_string())
}

fn scan_defines(source: &str) -> Vec<Define<'_>> {
    let mut defines = Vec::new();
    let mut line_start = 0;

    for line in source.split_inclusive('\n') {
        let mut cursor = 0;
        while let Some(pos) = line[cursor..].find(DEFINE_KEYWORD) {
            let after_keyword = cursor + pos + DEFINE_KEYWORD.len();
            if let Some((name, value)) = parse_define(line, after_keyword) {
                defines.push(Define {
                    name: &line[name],
                    value: &line[value.clone()],
                    value_span: line_start + value.start..line_start + value.end,
                });
            }
            cursor = after_keyword;
        }
        line_start += line.len();
    }

    defines
}

/// Parse `<ws>+ NAME <ws>+ "value"` starting right after the keyword.
///
/// Returns the name and value ranges relative to `line`. The value must be
/// non-empty and closed by a quote on the same line.
fn parse_define(line: &str, start: usize) -> Option<(Range<usize>, Range<usize>)> {
    let bytes = line.as_bytes();

    let name_start = skip_while(bytes, start, is_space);
    if name_start == start {
        return None;
    }

    let name_end = skip_while(bytes, name_start, is_ident);
    if name_end == name_start {
        return None;
    }

    let quote = skip_while(bytes, name_end, is_space);
    if quote == name_end || bytes.get(quote) != Some(&b'"') {
        return None;
    }

    let value_start = quote + 1;
    let value_len = line[value_start..].find(['"', '\n'])?;
    if value_len == 0 || bytes.get(value_start + value_len) != Some(&b'"') {
        return None;
    }

    Some((name_start..name_end, value_start..value_start + value_len))
}

fn skip_while(bytes: &[u8], mut index: usize, predicate: fn(u8) -> bool) -> usize {
    while bytes.get(index).is_some_and(|&b| predicate(b)) {
        index += 1;
    }
    index
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | 0x0b | 0x0c)
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
