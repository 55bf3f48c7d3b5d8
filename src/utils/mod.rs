//! # Utility Modules
//!
//! Supporting utilities for cryptography, logging, eventing, and lifecycle.
//!
//! ## Components
//! - **Crypto**: AES-CTR session cipher, one instance per direction
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe observability counters
//! - **Observers**: Ordered callback registries for connection/data events
//! - **Gate**: Cancellation gate awaited by the service-lifecycle task
//!
//! ## Security
//! - Cryptographically secure RNG (`rand_core::OsRng`)
//! - Memory zeroing for sensitive data (zeroize crate)

pub mod crypto;
pub mod gate;
pub mod logging;
pub mod metrics;
pub mod observers;

pub use gate::StopGate;
pub use observers::{CallbackId, CallbackRegistry};
