//! # Secure Session Protocol
//!
//! The password-authenticated key exchange and the routing logic around it.
//!
//! ## Components
//! - **srp**: phase and error codes of the 4-phase SRP-6a exchange
//! - **credentials**: long-term salted verifier storage (no plaintext password)
//! - **session**: per-connection authentication and cipher state machine
//! - **dispatcher**: marker-byte classification and routing of raw frames

pub mod credentials;
pub mod dispatcher;
pub mod session;
pub mod srp;
