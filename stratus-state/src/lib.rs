//! Stratus State Management
//!
//! Persists the objects Stratus manages together with the Azure resource IDs
//! they map to, and guards concurrent runs with a lock.
//!
//! - **StateFile**: every managed resource, its Azure ID and last-read attributes
//! - **StateBackend**: storage for the state file and its lock (local JSON file)
//! - **LockInfo**: who holds the lock, for which operation, until when
//!
//! # Example
//!
//! ```ignore
//! use stratus_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::local("stratus.state.json"))?;
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//!
//! // ... apply changes, then record them ...
//!
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
