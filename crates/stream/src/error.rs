//! Error taxonomy for stream construction and delegate installation.

use sable_engine_abi::AbiError;
use thiserror::Error;

/// Errors surfaced by stream construction and delegate installation.
///
/// Unknown-identifier dispatch and double destroy never appear here: the
/// former panics on the data trampolines (and no-ops on destroy), and the
/// latter is prevented structurally by the teardown compare-and-set. Nothing
/// in this taxonomy is transient - no caller should retry.
#[derive(Debug, Error)]
pub enum BridgeError {
	/// No engine vtable has been installed yet.
	#[error("native engine entry points are not installed")]
	EngineNotInstalled,

	/// [`engine::install`](crate::engine::install) was called twice.
	#[error("native engine entry points were already installed")]
	EngineAlreadyInstalled,

	/// The engine returned a null counterpart pointer.
	#[error("native engine failed to allocate a stream counterpart")]
	AllocationFailed,

	/// The indexed registrar reported the wrong number of callback slots.
	#[error("indexed delegate list has {got} entries, expected {expected}")]
	DelegateCount {
		/// The fixed delegate-table size.
		expected: usize,
		/// The number of slots the registrar reported.
		got: usize,
	},

	/// An indexed callback slot could not be parsed as an integer.
	#[error("invalid indexed delegate entry {entry:?}")]
	DelegateParse {
		/// The offending list entry.
		entry: String,
	},

	/// The installed engine has no indexed installation entry point.
	#[error("engine does not support indexed delegate installation")]
	IndexedUnsupported,

	/// Engine library loading or symbol resolution failed.
	#[error(transparent)]
	Abi(#[from] AbiError),
}
