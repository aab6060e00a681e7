//! C-ABI definitions for the native engine's managed-stream boundary.
//!
//! This crate contains only type definitions and symbol resolution - no
//! bridge logic. The engine consumes a fixed table of 12 stream callbacks
//! ([`StreamProcs`]) and exposes three entry points in return: counterpart
//! allocation, counterpart destruction, and dispatch-table installation
//! ([`EngineVTable`]). A fourth, optional entry point installs the callbacks
//! by integer slot for embeddings where the engine cannot hold raw function
//! addresses.

use std::ffi::c_void;

use libloading::Library;
use thiserror::Error;

/// Opaque pointer identifying one native stream counterpart.
///
/// Never null for a live pairing; only meaningful for equality and lookup.
pub type RawStream = *mut c_void;

/// Number of entries in the delegate table.
pub const PROC_COUNT: usize = 12;

// Stream callback signatures, in delegate-table order. The engine stores
// these addresses once and invokes them without re-resolving, so every
// callback must stay valid for the process lifetime. `C-unwind` lets a
// protocol-violation panic propagate as a defined failure.

/// Reads up to `size` bytes into `buffer`; returns bytes actually read.
pub type ReadProc = extern "C-unwind" fn(stream: RawStream, buffer: *mut c_void, size: usize) -> usize;
/// Like [`ReadProc`] but must not advance the stream position.
pub type PeekProc = extern "C-unwind" fn(stream: RawStream, buffer: *mut c_void, size: usize) -> usize;
/// Returns true once the stream position has reached the end.
pub type IsAtEndProc = extern "C-unwind" fn(stream: RawStream) -> bool;
/// Returns true if the stream can report and change its position.
pub type HasPositionProc = extern "C-unwind" fn(stream: RawStream) -> bool;
/// Returns true if the stream can report its total length.
pub type HasLengthProc = extern "C-unwind" fn(stream: RawStream) -> bool;
/// Resets the position to the start; false if unsupported or failed.
pub type RewindProc = extern "C-unwind" fn(stream: RawStream) -> bool;
/// Returns the current position.
pub type GetPositionProc = extern "C-unwind" fn(stream: RawStream) -> usize;
/// Seeks to an absolute position.
pub type SeekProc = extern "C-unwind" fn(stream: RawStream, position: usize) -> bool;
/// Moves the position by a relative offset.
pub type MoveProc = extern "C-unwind" fn(stream: RawStream, offset: i32) -> bool;
/// Returns the total length.
pub type GetLengthProc = extern "C-unwind" fn(stream: RawStream) -> usize;
/// Returns a fresh duplicate counterpart, or null if unsupported.
pub type CreateNewProc = extern "C-unwind" fn(stream: RawStream) -> RawStream;
/// Signals that the engine has torn down the counterpart.
pub type DestroyProc = extern "C-unwind" fn(stream: RawStream);

/// The delegate table installed into the engine's global dispatch slots.
///
/// Installed exactly once per process and immutable afterwards. Field order
/// is ABI: it matches the engine's `gfx_managedstream_set_procs` layout.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StreamProcs {
	pub read: ReadProc,
	pub peek: PeekProc,
	pub is_at_end: IsAtEndProc,
	pub has_position: HasPositionProc,
	pub has_length: HasLengthProc,
	pub rewind: RewindProc,
	pub get_position: GetPositionProc,
	pub seek: SeekProc,
	pub move_by: MoveProc,
	pub get_length: GetLengthProc,
	pub create_new: CreateNewProc,
	pub destroy: DestroyProc,
}

/// Allocates a fresh native stream counterpart; null on failure.
pub type StreamNewFn = unsafe extern "C" fn() -> RawStream;
/// Destroys a native stream counterpart. Must be called at most once.
pub type StreamDestroyFn = unsafe extern "C" fn(stream: RawStream);
/// Installs the delegate table into the engine's global dispatch slots.
pub type SetProcsFn = unsafe extern "C" fn(procs: *const StreamProcs);
/// Installs the delegate table by integer slot values instead of addresses.
pub type SetProcsIndexedFn = unsafe extern "C" fn(slots: *const u32, len: usize);

/// Exported symbol names for the engine entry points.
pub const SYM_STREAM_NEW: &[u8] = b"gfx_managedstream_new";
pub const SYM_STREAM_DESTROY: &[u8] = b"gfx_managedstream_destroy";
pub const SYM_SET_PROCS: &[u8] = b"gfx_managedstream_set_procs";
pub const SYM_SET_PROCS_INDEXED: &[u8] = b"gfx_managedstream_set_procs_indexed";

/// The engine entry points the bridge consumes.
#[derive(Clone, Copy)]
pub struct EngineVTable {
	pub stream_new: StreamNewFn,
	pub stream_destroy: StreamDestroyFn,
	pub set_procs: SetProcsFn,
	/// Slot-based installation for the narrow bridging variant; engines
	/// built without that support leave this unset.
	pub set_procs_indexed: Option<SetProcsIndexedFn>,
}

impl EngineVTable {
	/// Resolves the engine entry points from an already-loaded library.
	///
	/// # Safety
	/// The library must export the documented symbols with matching
	/// signatures and must stay loaded for as long as the table is used.
	pub unsafe fn from_library(lib: &Library) -> Result<Self, AbiError> {
		unsafe {
			let stream_new = *lib
				.get::<StreamNewFn>(SYM_STREAM_NEW)
				.map_err(|source| AbiError::Symbol { name: "gfx_managedstream_new", source })?;
			let stream_destroy = *lib
				.get::<StreamDestroyFn>(SYM_STREAM_DESTROY)
				.map_err(|source| AbiError::Symbol { name: "gfx_managedstream_destroy", source })?;
			let set_procs = *lib
				.get::<SetProcsFn>(SYM_SET_PROCS)
				.map_err(|source| AbiError::Symbol { name: "gfx_managedstream_set_procs", source })?;
			let set_procs_indexed = lib.get::<SetProcsIndexedFn>(SYM_SET_PROCS_INDEXED).ok().map(|sym| *sym);

			Ok(Self {
				stream_new,
				stream_destroy,
				set_procs,
				set_procs_indexed,
			})
		}
	}
}

/// Errors from loading the engine library or resolving its entry points.
#[derive(Debug, Error)]
pub enum AbiError {
	/// The engine library itself could not be loaded.
	#[error("failed to load engine library: {0}")]
	Library(#[from] libloading::Error),

	/// A required entry point is missing or malformed.
	#[error("missing engine symbol {name}: {source}")]
	Symbol {
		/// The unresolved symbol.
		name: &'static str,
		/// The underlying loader error.
		source: libloading::Error,
	},
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn delegate_table_is_twelve_pointer_sized_slots() {
		assert_eq!(
			std::mem::size_of::<StreamProcs>(),
			PROC_COUNT * std::mem::size_of::<usize>(),
			"table layout must match the engine's 12-slot expectation"
		);
		assert_eq!(std::mem::align_of::<StreamProcs>(), std::mem::align_of::<usize>());
	}
}
