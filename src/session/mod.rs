//! Session management
//!
//! One session per live connection. The session owns the connection's client
//! id and decides, for every request, what to send back to the sender and
//! what to announce to everyone else:
//!
//! | request        | reply            | broadcast to others                  |
//! |----------------|------------------|--------------------------------------|
//! | `get_document` | `document`       | -                                    |
//! | `request_lock` | `lock_response`  | `lock_status` (locked) when acquired |
//! | `release_lock` | `lock_released`  | `lock_status` (unlocked) if released |
//! | `renew_lock`   | `lock_renewed`   | -                                    |
//! | `edit`         | `ack` or `error` | `document` when applied              |

pub mod handler;
pub mod state;

pub use handler::SessionHandler;
pub use state::{SessionPhase, SessionState};
