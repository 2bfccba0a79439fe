//! Snapshot compaction: raw accessibility dump in, pruned text and a
//! reference table out.

pub mod compactor;
pub mod line;
pub mod roles;
pub mod stats;
pub mod tree;

pub use compactor::{EMPTY_SNAPSHOT, NO_INTERACTIVE_ELEMENTS, compact_snapshot};
pub use line::{DumpLine, PassthroughLine, RoleLine, parse_line};
pub use roles::{RoleClass, is_interactive, receives_ref, role_class};
pub use stats::{SnapshotStats, snapshot_stats};
pub use tree::{TreeLine, compact_tree, retain_mask};
