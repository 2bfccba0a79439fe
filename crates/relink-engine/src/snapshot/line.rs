//! Tolerant parser for one line of an indented accessibility dump.
//!
//! The grammar is `<indent>- <role> "<name>"<trailing>`. Anything else is a
//! [`DumpLine::Passthrough`]; parsing never fails.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static ROLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*-\s*)(\w+)(?:\s+"([^"]*)")?(.*)$"#).expect("role line pattern")
});

static NATIVE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[ref=([^\]\s]+)\]").expect("native ref pattern"));

/// Spaces per indentation level.
pub const INDENT_WIDTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpLine<'a> {
    Role(RoleLine<'a>),
    Passthrough(PassthroughLine<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleLine<'a> {
    pub raw: &'a str,
    pub depth: usize,
    /// Indentation plus the `- ` marker, kept verbatim for re-rendering.
    pub prefix: &'a str,
    pub role: &'a str,
    /// Accessible name; an empty quoted name counts as no name.
    pub name: Option<&'a str>,
    /// Annotations after the name with any native `[ref=..]` removed.
    pub trailing: Cow<'a, str>,
    /// Driver-minted ref already present on the line.
    pub native_ref: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughLine<'a> {
    pub raw: &'a str,
    pub depth: usize,
}

impl<'a> DumpLine<'a> {
    pub fn raw(&self) -> &'a str {
        match self {
            DumpLine::Role(line) => line.raw,
            DumpLine::Passthrough(line) => line.raw,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            DumpLine::Role(line) => line.depth,
            DumpLine::Passthrough(line) => line.depth,
        }
    }
}

/// Indentation depth of a raw line; two spaces per level.
pub fn indent_depth(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ').count() / INDENT_WIDTH
}

pub fn parse_line(raw: &str) -> DumpLine<'_> {
    let depth = indent_depth(raw);

    let Some(caps) = ROLE_LINE.captures(raw) else {
        return DumpLine::Passthrough(PassthroughLine { raw, depth });
    };

    let (Some(prefix), Some(role)) = (caps.get(1), caps.get(2)) else {
        return DumpLine::Passthrough(PassthroughLine { raw, depth });
    };

    let name = caps
        .get(3)
        .map(|m| m.as_str())
        .filter(|name| !name.is_empty());
    let trailing = caps.get(4).map(|m| m.as_str()).unwrap_or("");

    let (trailing, native_ref) = match NATIVE_REF.captures(trailing) {
        Some(ref_caps) => {
            let token = ref_caps.get(1).map(|m| m.as_str());
            (NATIVE_REF.replace(trailing, ""), token)
        }
        None => (Cow::Borrowed(trailing), None),
    };

    DumpLine::Role(RoleLine {
        raw,
        depth,
        prefix: prefix.as_str(),
        role: role.as_str(),
        name,
        trailing,
        native_ref,
    })
}
