pub mod ax_dump;
pub mod backend;
pub mod cdp;
pub mod dialogs;

pub use backend::HeadlessPage;
pub use dialogs::{DialogQueue, PendingDialog};
