use super::roles::is_interactive;
use relink_common::refs::Snapshot;
use serde::Serialize;

/// Rough size of a snapshot, for agents budgeting their context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub lines: usize,
    pub chars: usize,
    /// Approximation at four characters per token.
    pub estimated_tokens: usize,
    pub refs: usize,
    pub interactive: usize,
}

pub fn snapshot_stats(snapshot: &Snapshot) -> SnapshotStats {
    let chars = snapshot.text.chars().count();
    SnapshotStats {
        lines: snapshot.text.lines().count(),
        chars,
        estimated_tokens: chars.div_ceil(4),
        refs: snapshot.refs.len(),
        interactive: snapshot
            .refs
            .iter()
            .filter(|(_, r)| is_interactive(&r.role))
            .count(),
    }
}
