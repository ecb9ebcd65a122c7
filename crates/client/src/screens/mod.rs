//! Screen state for the dashboard views.
//!
//! A screen owns request-scoped copies of backend data plus the state of any
//! open dialog. After every successful mutation the screen re-fetches its
//! list; local copies are never patched optimistically.

pub mod purchase_orders;
pub mod quarantine;

pub use purchase_orders::{PurchaseOrderScreen, StatusDialog, StatusDialogKind};
pub use quarantine::{ActionDialog, QuarantineScreen};
