pub mod error;
pub mod failure;
pub mod formatter;
pub mod refs;

pub use error::BackendError;
pub use failure::{DiagnosticError, ErrorContext, FailureKind};
pub use refs::{
    RefMode, ReferenceTable, RoleRef, Snapshot, SnapshotOptions, is_generated_ref, normalize_ref,
};
