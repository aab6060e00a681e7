//! Managed-to-native stream bridge for the sable engine.
//!
//! The engine only understands a C-style stream interface defined by function
//! pointers; this crate lets a Rust [`StreamSource`] implementation stand in
//! behind that interface. The hard part is the bidirectional lifetime bridge:
//! the engine identifies each stream by an opaque counterpart pointer and may
//! invoke callbacks - including the destroy signal - from threads the host
//! does not control, concurrently with host-side disposal.
//!
//! # Modules
//!
//! - [`stream`] - the capability contract and the registration/teardown
//!   protocol ([`BridgedStream`])
//! - [`procs`] - the fixed callback trampolines the engine dispatches through
//! - [`indexed`] - narrow-integer variant for embeddings that cannot hand the
//!   engine raw function addresses
//! - [`engine`] - process-wide installation of the engine entry points
//! - [`error`] - the error taxonomy
//!
//! # Lifecycle
//!
//! Install the engine entry points once ([`engine::install`] or
//! [`engine::install_from_path`]), then construct streams. Construction
//! allocates the native counterpart and registers the pairing; teardown from
//! either side funnels through one atomic compare-and-set so the counterpart
//! is destroyed at most once.

pub mod engine;
pub mod error;
pub mod indexed;
pub mod procs;
mod registry;
pub mod stream;

pub use error::BridgeError;
pub use indexed::ProcRegistrar;
pub use sable_engine_abi as abi;
pub use stream::{BridgedStream, StreamSource, TeardownOrigin};
