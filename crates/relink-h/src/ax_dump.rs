//! Chromium accessibility tree to indented dump text.
//!
//! `Accessibility.getFullAXTree` returns a flat node list linked by ids. It is
//! walked depth-first from the root into [`DumpNode`]s, which render as
//! `- role "name"` lines and are also what ref resolution searches, so both
//! see the same nodes in the same order.

use chromiumoxide::cdp::browser_protocol::accessibility::{AxNode, AxValue};
use std::collections::{HashMap, HashSet};

/// Chromium roles that never reach the dump. Their text is already in the parent.
const SKIP_ROLES: &[&str] = &["InlineTextBox", "LineBreak"];

const TEXT_ROLE: &str = "StaticText";

/// One AX node, detached from the CDP types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxEntry {
    pub id: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub role: String,
    pub name: String,
    pub value: Option<String>,
    pub ignored: bool,
    pub backend_node_id: Option<i64>,
}

fn ax_string(value: &Option<AxValue>) -> Option<String> {
    let value = value.as_ref()?.value.as_ref()?;
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

impl From<&AxNode> for AxEntry {
    fn from(node: &AxNode) -> Self {
        Self {
            id: node.node_id.inner().to_string(),
            parent: node.parent_id.as_ref().map(|id| id.inner().to_string()),
            children: node
                .child_ids
                .as_ref()
                .map(|ids| ids.iter().map(|id| id.inner().to_string()).collect())
                .unwrap_or_default(),
            role: ax_string(&node.role).unwrap_or_default(),
            name: ax_string(&node.name).unwrap_or_default(),
            value: ax_string(&node.value).filter(|v| !v.is_empty()),
            ignored: node.ignored,
            backend_node_id: node.backend_dom_node_id.as_ref().map(|id| *id.inner()),
        }
    }
}

/// A node as it appears in the dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpNode {
    pub depth: usize,
    /// Dump role: lowercased ARIA role, `document` for the root, `text` for text runs.
    pub role: String,
    /// Name as rendered; quotes are replaced so the line stays parseable.
    pub name: String,
    pub value: Option<String>,
    pub has_children: bool,
    pub backend_node_id: Option<i64>,
}

impl DumpNode {
    fn render(&self) -> String {
        let indent = "  ".repeat(self.depth);
        if self.role == "text" {
            return format!("{}- text: {}", indent, self.name);
        }

        let mut line = format!("{}- {}", indent, self.role);
        if !self.name.is_empty() {
            line.push_str(&format!(" \"{}\"", self.name));
        }
        if let Some(value) = &self.value {
            line.push_str(&format!(": {}", single_line(value)));
        } else if self.has_children {
            line.push(':');
        }
        line
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accessible name the way the dump shows it.
pub fn display_name(name: &str) -> String {
    single_line(name).replace('"', "'")
}

fn dump_role(role: &str) -> String {
    match role {
        "RootWebArea" | "WebArea" => "document".to_string(),
        TEXT_ROLE => "text".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

#[derive(Debug, Default)]
pub struct AxTree {
    entries: Vec<AxEntry>,
    index: HashMap<String, usize>,
}

impl AxTree {
    pub fn new(entries: Vec<AxEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        Self { entries, index }
    }

    pub fn from_nodes(nodes: &[AxNode]) -> Self {
        Self::new(nodes.iter().map(AxEntry::from).collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Depth-first, document order. Ignored nodes are transparent: their
    /// children are lifted to the ignored node's depth. Each node is visited
    /// once, so malformed trees with shared or cyclic child links terminate.
    pub fn flatten(&self) -> Vec<DumpNode> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let is_root = entry
                .parent
                .as_ref()
                .is_none_or(|p| !self.index.contains_key(p));
            if is_root {
                self.walk(i, &mut visited, &mut out);
            }
        }

        for i in 0..out.len() {
            let has_children = out.get(i + 1).is_some_and(|next| next.depth > out[i].depth);
            out[i].has_children = has_children;
        }
        out
    }

    fn walk(&self, root: usize, visited: &mut HashSet<usize>, out: &mut Vec<DumpNode>) {
        // (entry, depth, name of the nearest rendered ancestor)
        let mut stack: Vec<(usize, usize, Option<String>)> = vec![(root, 0, None)];

        while let Some((idx, depth, parent_name)) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            let entry = &self.entries[idx];
            if SKIP_ROLES.contains(&entry.role.as_str()) {
                continue;
            }

            let name = display_name(&entry.name);
            let duplicate_text = entry.role == TEXT_ROLE
                && (name.is_empty() || parent_name.as_deref() == Some(name.as_str()));
            let (child_depth, child_parent_name) =
                if !entry.ignored && !duplicate_text && !entry.role.is_empty() {
                    out.push(DumpNode {
                        depth,
                        role: dump_role(&entry.role),
                        name: name.clone(),
                        value: entry.value.clone(),
                        has_children: false,
                        backend_node_id: entry.backend_node_id,
                    });
                    (depth + 1, Some(name))
                } else {
                    (depth, parent_name)
                };

            for child in entry.children.iter().rev() {
                if let Some(&child_idx) = self.index.get(child) {
                    stack.push((child_idx, child_depth, child_parent_name.clone()));
                }
            }
        }
    }
}

/// Render flattened nodes as dump text, one line per node.
pub fn render_dump(nodes: &[DumpNode]) -> String {
    nodes
        .iter()
        .map(DumpNode::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Nodes a `(role, name)` locator can match, in document order, honoring the
/// depth limit the snapshot was taken with.
pub fn candidates<'a>(
    nodes: &'a [DumpNode],
    role: &str,
    name: Option<&str>,
    max_depth: Option<usize>,
) -> Vec<&'a DumpNode> {
    let name = name.unwrap_or("");
    nodes
        .iter()
        .filter(|n| max_depth.is_none_or(|max| n.depth <= max))
        .filter(|n| n.role == role && n.name == name)
        .collect()
}
