//! Second compaction pass: drop lines that carry no ref, no label and no
//! non-structural name, unless they lead to a retained descendant.

use super::line::RoleLine;
use super::roles::{RoleClass, role_class};

/// One rendered line of a snapshot tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    pub text: String,
    pub depth: usize,
    pub has_ref: bool,
    /// Inline content after the name, e.g. `- paragraph: Some text`.
    pub labeled: bool,
    /// Named line whose role is not a layout container.
    pub named: bool,
}

impl TreeLine {
    /// A line outside the role grammar; the label is read off the raw text.
    pub fn new(text: impl Into<String>, depth: usize, has_ref: bool) -> Self {
        let text = text.into();
        let labeled = is_label(&text);
        Self {
            text,
            depth,
            has_ref,
            labeled,
            named: false,
        }
    }

    /// A role line; only the text after the accessible name can label it.
    pub fn from_role(line: &RoleLine<'_>, text: impl Into<String>, has_ref: bool) -> Self {
        Self {
            text: text.into(),
            depth: line.depth,
            has_ref,
            labeled: is_label(&line.trailing),
            named: line.name.is_some() && role_class(line.role) != RoleClass::Structural,
        }
    }

    pub fn is_labeled(&self) -> bool {
        self.labeled
    }

    /// Survives compaction regardless of its descendants.
    pub fn stands_alone(&self) -> bool {
        self.has_ref || self.labeled || self.named
    }
}

/// A trailing bare colon only introduces children and is not a label.
fn is_label(text: &str) -> bool {
    let text = text.trim_end();
    text.contains(':') && !text.ends_with(':')
}

/// Retain-mask for `lines`: `true` where the line survives compaction.
///
/// Two linear passes. Top-down records each line's nearest shallower
/// ancestor; bottom-up marks a line retained if it stands alone (ref, label or
/// non-structural name) or has a retained child, and then flags only that ancestor. Because children sit
/// below their parent, each flag is consumed later in the same scan, which
/// is enough to cascade up the whole ancestor chain.
pub fn retain_mask(lines: &[TreeLine]) -> Vec<bool> {
    let mut parent: Vec<Option<usize>> = Vec::with_capacity(lines.len());
    let mut open: Vec<usize> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        while let Some(&top) = open.last() {
            if lines[top].depth >= line.depth {
                open.pop();
            } else {
                break;
            }
        }
        parent.push(open.last().copied());
        open.push(idx);
    }

    let mut retained = vec![false; lines.len()];
    let mut has_retained_child = vec![false; lines.len()];

    for idx in (0..lines.len()).rev() {
        let line = &lines[idx];
        retained[idx] = line.stands_alone() || has_retained_child[idx];
        if retained[idx] {
            if let Some(p) = parent[idx] {
                has_retained_child[p] = true;
            }
        }
    }

    retained
}

/// Apply [`retain_mask`] and return the surviving lines in order.
pub fn compact_tree(lines: Vec<TreeLine>) -> Vec<TreeLine> {
    let mask = retain_mask(&lines);
    lines
        .into_iter()
        .zip(mask)
        .filter_map(|(line, keep)| keep.then_some(line))
        .collect()
}
