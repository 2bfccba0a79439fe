//! Accessibility dump -> pruned tree text + reference table.

use super::line::{DumpLine, RoleLine, parse_line};
use super::roles::{is_interactive, receives_ref};
use super::tree::{TreeLine, compact_tree};
use relink_common::refs::{RefMode, ReferenceTable, RoleRef, Snapshot, SnapshotOptions};
use std::collections::HashMap;
use tracing::debug;

pub const EMPTY_SNAPSHOT: &str = "(empty)";
pub const NO_INTERACTIVE_ELEMENTS: &str = "(no interactive elements)";

/// Hands out tokens and tracks `(role, name)` occurrences for disambiguation.
///
/// In [`RefMode::Role`] tokens are minted `e1`, `e2`, ... . In
/// [`RefMode::Aria`] the table holds driver-native tokens only, since the
/// locator forwards every Aria token to the driver untouched: a line without
/// a native ref, or repeating a native ref already taken, stays unreferenced.
struct RefAllocator {
    mode: RefMode,
    next_id: usize,
    counts: HashMap<(String, Option<String>), usize>,
    table: ReferenceTable,
}

impl RefAllocator {
    fn new(mode: RefMode) -> Self {
        Self {
            mode,
            next_id: 1,
            counts: HashMap::new(),
            table: ReferenceTable::new(mode),
        }
    }

    /// Assign a token to a line, returning it with the line's `nth`.
    fn assign(&mut self, line: &RoleLine<'_>) -> Option<(String, usize)> {
        let token = match self.mode {
            RefMode::Aria => {
                let native = line.native_ref?;
                if self.table.contains(native) {
                    debug!("native ref {} repeated, leaving line unreferenced", native);
                    return None;
                }
                native.to_string()
            }
            RefMode::Role => {
                let token = format!("e{}", self.next_id);
                self.next_id += 1;
                token
            }
        };

        let name = line.name.map(str::to_string);
        let count = self
            .counts
            .entry((line.role.to_string(), name.clone()))
            .or_insert(0);
        let nth = *count;
        *count += 1;

        self.table.insert(
            token.clone(),
            RoleRef {
                role: line.role.to_string(),
                name,
                nth: Some(nth),
            },
        );
        Some((token, nth))
    }

    /// Drop `nth` from every ref whose `(role, name)` key occurred once.
    fn finish(mut self) -> ReferenceTable {
        let tokens: Vec<String> = self.table.tokens().map(str::to_string).collect();
        for token in tokens {
            if let Some(role_ref) = self.table.get_mut(&token) {
                let key = (role_ref.role.clone(), role_ref.name.clone());
                if self.counts.get(&key).copied().unwrap_or(0) <= 1 {
                    role_ref.nth = None;
                }
            }
        }
        self.table
    }
}

/// Re-render a role line, with `[ref=..]` and `[nth=..]` when it was assigned one.
fn render_role_line(
    line: &RoleLine<'_>,
    prefix: &str,
    trailing: &str,
    assigned: Option<(&str, usize)>,
) -> String {
    let mut out = format!("{}{}", prefix, line.role);
    if let Some(name) = line.name {
        out.push_str(&format!(" \"{}\"", name));
    }
    if let Some((token, nth)) = assigned {
        out.push_str(&format!(" [ref={}]", token));
        if nth > 0 {
            out.push_str(&format!(" [nth={}]", nth));
        }
    }
    out.push_str(trailing);
    out
}

/// Compact a raw accessibility dump.
///
/// Never fails: lines outside the role-line grammar are carried verbatim
/// (or dropped in `interactive_only` mode). The ref mode is decided on the
/// whole dump, before the depth limit applies.
pub fn compact_snapshot(dump: &str, options: &SnapshotOptions) -> Snapshot {
    let parsed: Vec<DumpLine<'_>> = dump
        .lines()
        .filter(|raw| !raw.trim().is_empty())
        .map(parse_line)
        .collect();

    let mode = if parsed
        .iter()
        .any(|line| matches!(line, DumpLine::Role(role) if role.native_ref.is_some()))
    {
        RefMode::Aria
    } else {
        RefMode::Role
    };
    let lines: Vec<DumpLine<'_>> = parsed
        .into_iter()
        .filter(|line| options.max_depth.is_none_or(|max| line.depth() <= max))
        .collect();
    let mut allocator = RefAllocator::new(mode);

    if options.interactive_only {
        let mut out = Vec::new();
        for line in &lines {
            let DumpLine::Role(role_line) = line else {
                continue;
            };
            if !is_interactive(role_line.role) {
                continue;
            }
            let Some((token, nth)) = allocator.assign(role_line) else {
                continue;
            };
            let trailing = role_line.trailing.trim_end().trim_end_matches(':');
            out.push(render_role_line(
                role_line,
                "- ",
                trailing,
                Some((token.as_str(), nth)),
            ));
        }

        let refs = allocator.finish();
        debug!("interactive-only snapshot compacted: {} refs", refs.len());
        let text = if out.is_empty() {
            NO_INTERACTIVE_ELEMENTS.to_string()
        } else {
            out.join("\n")
        };
        return Snapshot { text, refs };
    }

    let mut tree = Vec::with_capacity(lines.len());
    for line in &lines {
        match line {
            DumpLine::Role(role_line) => {
                let assigned = if receives_ref(role_line.role, role_line.name.is_some()) {
                    allocator.assign(role_line)
                } else {
                    None
                };
                let text = match &assigned {
                    Some((token, nth)) => render_role_line(
                        role_line,
                        role_line.prefix,
                        &role_line.trailing,
                        Some((token.as_str(), *nth)),
                    ),
                    // Strip a native annotation the table does not carry.
                    None if role_line.native_ref.is_some() => {
                        render_role_line(role_line, role_line.prefix, &role_line.trailing, None)
                    }
                    None => role_line.raw.to_string(),
                };
                tree.push(TreeLine::from_role(role_line, text, assigned.is_some()));
            }
            DumpLine::Passthrough(passthrough) => {
                tree.push(TreeLine::new(passthrough.raw, passthrough.depth, false));
            }
        }
    }

    let total = tree.len();
    if options.compact {
        tree = compact_tree(tree);
    }

    let refs = allocator.finish();
    debug!(
        "snapshot compacted: {} refs, {} lines ({} dropped)",
        refs.len(),
        tree.len(),
        total - tree.len()
    );

    let text = if tree.is_empty() {
        EMPTY_SNAPSHOT.to_string()
    } else {
        tree.into_iter()
            .map(|line| line.text)
            .collect::<Vec<_>>()
            .join("\n")
    };

    Snapshot { text, refs }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: SnapshotOptions = SnapshotOptions {
        interactive_only: false,
        max_depth: None,
        compact: false,
    };

    #[test]
    fn assigns_refs_to_interactive_and_named_content() {
        let dump = "- main:\n  - heading \"Sign in\" [level=1]\n  - heading\n  - textbox \"Email\"\n  - button \"Continue\"";
        let snap = compact_snapshot(dump, &FULL);

        assert_eq!(
            snap.text,
            "- main:\n  - heading \"Sign in\" [ref=e1] [level=1]\n  - heading\n  - textbox \"Email\" [ref=e2]\n  - button \"Continue\" [ref=e3]"
        );
        assert_eq!(snap.refs.len(), 3);
        assert_eq!(snap.refs.mode, RefMode::Role);
        let button = snap.refs.get("e3").unwrap();
        assert_eq!(button.role, "button");
        assert_eq!(button.name.as_deref(), Some("Continue"));
        assert_eq!(button.nth, None);
    }

    #[test]
    fn duplicates_keep_nth_and_unique_pairs_lose_it() {
        let dump = "- button \"Add\"\n- button \"Add\"\n- button \"Remove\"";
        let snap = compact_snapshot(dump, &FULL);

        assert_eq!(snap.refs.get("e1").unwrap().nth, Some(0));
        assert_eq!(snap.refs.get("e2").unwrap().nth, Some(1));
        assert_eq!(snap.refs.get("e3").unwrap().nth, None);
        assert!(snap.text.contains("- button \"Add\" [ref=e2] [nth=1]"));
        assert!(snap.text.contains("- button \"Add\" [ref=e1]\n"));
    }

    #[test]
    fn interactive_only_flattens() {
        let dump = "- navigation:\n  - list:\n    - listitem:\n      - link \"Docs\":\n        - /url: /docs\n  - heading \"News\"";
        let options = SnapshotOptions {
            interactive_only: true,
            ..FULL
        };
        let snap = compact_snapshot(dump, &options);
        assert_eq!(snap.text, "- link \"Docs\" [ref=e1]");
        assert_eq!(snap.refs.len(), 1);
    }

    #[test]
    fn interactive_only_without_matches() {
        let options = SnapshotOptions {
            interactive_only: true,
            ..FULL
        };
        let snap = compact_snapshot("- heading \"Title\"", &options);
        assert_eq!(snap.text, NO_INTERACTIVE_ELEMENTS);
        assert!(snap.refs.is_empty());
    }

    #[test]
    fn max_depth_drops_before_assignment() {
        let dump = "- group:\n  - button \"A\"\n    - button \"Deep\"\n  - button \"B\"";
        let options = SnapshotOptions {
            max_depth: Some(1),
            ..FULL
        };
        let snap = compact_snapshot(dump, &options);
        assert!(!snap.text.contains("Deep"));
        assert_eq!(snap.refs.get("e2").unwrap().name.as_deref(), Some("B"));
        assert_eq!(snap.refs.len(), 2);
    }

    #[test]
    fn compact_prunes_empty_structure() {
        let dump = "- generic:\n  - generic:\n    - img\n  - group:\n    - checkbox \"Remember me\"";
        let options = SnapshotOptions {
            compact: true,
            ..FULL
        };
        let snap = compact_snapshot(dump, &options);
        assert_eq!(
            snap.text,
            "- generic:\n  - group:\n    - checkbox \"Remember me\" [ref=e1]"
        );
    }

    #[test]
    fn native_refs_switch_to_aria_mode() {
        let dump = "- button \"Go\" [ref=s1e4]\n- link \"Back\" [ref=s1e9]";
        let snap = compact_snapshot(dump, &FULL);
        assert_eq!(snap.refs.mode, RefMode::Aria);
        assert!(snap.refs.contains("s1e4"));
        assert!(snap.refs.contains("s1e9"));
        assert_eq!(snap.text, "- button \"Go\" [ref=s1e4]\n- link \"Back\" [ref=s1e9]");
    }

    #[test]
    fn native_tokens_are_never_shadowed_by_minted_ones() {
        let snap = compact_snapshot("- button \"Go\" [ref=e1]\n- heading \"Title\"", &FULL);
        assert_eq!(snap.text, "- button \"Go\" [ref=e1]\n- heading \"Title\"");
        assert_eq!(snap.refs.len(), 1);
        let button = snap.refs.get("e1").unwrap();
        assert_eq!(button.role, "button");
        assert_eq!(button.name.as_deref(), Some("Go"));
    }

    #[test]
    fn repeated_native_token_is_referenced_once() {
        let snap = compact_snapshot("- button \"A\" [ref=e1]\n- link \"B\" [ref=e1]", &FULL);
        assert_eq!(snap.text, "- button \"A\" [ref=e1]\n- link \"B\"");
        assert_eq!(snap.refs.len(), 1);
        assert_eq!(snap.refs.get("e1").unwrap().role, "button");
    }

    #[test]
    fn native_annotation_dropped_from_unreferenced_lines() {
        let snap = compact_snapshot("- generic [ref=e2]:\n  - button \"Go\" [ref=e3]", &FULL);
        assert_eq!(snap.text, "- generic:\n  - button \"Go\" [ref=e3]");
        assert!(!snap.refs.contains("e2"));
    }

    #[test]
    fn ref_mode_is_decided_before_the_depth_limit() {
        let options = SnapshotOptions {
            max_depth: Some(0),
            ..FULL
        };
        let snap = compact_snapshot("- heading \"Title\":\n  - button \"Go\" [ref=e5]", &options);
        assert_eq!(snap.refs.mode, RefMode::Aria);
        assert!(snap.refs.is_empty());
        assert_eq!(snap.text, "- heading \"Title\":");
    }

    #[test]
    fn compact_keys_on_names_not_colons_inside_them() {
        let dump = "- banner:\n  - img \"Company logo\"\n  - generic \"Promo: 20% off\"\n  - generic \"Breaking news\"";
        let options = SnapshotOptions {
            compact: true,
            ..FULL
        };
        let snap = compact_snapshot(dump, &options);
        assert_eq!(snap.text, "- banner:\n  - img \"Company logo\"");
        assert!(snap.refs.is_empty());
    }

    #[test]
    fn empty_dump() {
        let snap = compact_snapshot("  \n", &FULL);
        assert_eq!(snap.text, EMPTY_SNAPSHOT);
        assert!(snap.refs.is_empty());
    }

    #[test]
    fn malformed_lines_pass_through() {
        let dump = "garbage line\n- button \"Ok\"\n\"unterminated";
        let snap = compact_snapshot(dump, &FULL);
        assert_eq!(
            snap.text,
            "garbage line\n- button \"Ok\" [ref=e1]\n\"unterminated"
        );
    }
}
