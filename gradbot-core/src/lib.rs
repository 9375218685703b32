//! gradbot-core: client-side state synchronization for the GradBot document chat backend.
//!
//! The backend owns documents, retrieval and the language model. This crate
//! only mirrors its state for one browser session at a time and issues the
//! HTTP calls that change it.
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod session;
pub mod sync;
pub mod transport;

pub use error::{AppError, SyncError};
pub use session::SessionRegistry;
pub use sync::{BusyFlags, SendOutcome, SessionSnapshot, SyncOptions, Synchronizer};
pub use transport::{HttpTransport, MockTransport, Operation, Transport};
