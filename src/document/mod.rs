//! Shared document and editor lease
//!
//! One [`SharedDocument`] lives for the whole process. It owns the text, a
//! monotonically increasing version and the editor lease, all behind a single
//! mutex:
//!
//! ```text
//!              Arc<SharedDocument>
//!         ┌───────────────────────────┐
//!         │ Mutex<{                   │
//!         │   content: String,        │
//!         │   version: u64,           │
//!         │   lock: EditorLock,       │
//!         │ }>                        │
//!         └─────────────┬─────────────┘
//!                       │
//!        ┌──────────────┼──────────────┐
//!        ▼              ▼              ▼
//!    [Session]      [Session]      [Session]
//! ```
//!
//! Edits are last-write-wins whole-document replacements. The lease only
//! steers clients away from overwriting each other; it never blocks.

pub mod lock;
pub mod store;

pub use lock::{AcquireOutcome, EditorLock, Lease, LockStatus};
pub use store::{
    DocumentSnapshot, DocumentView, EditOutcome, SharedDocument, DEFAULT_LOCK_TIMEOUT,
};
