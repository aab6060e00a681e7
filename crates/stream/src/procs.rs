//! Callback trampolines dispatched by the native engine.
//!
//! The engine stores the addresses in [`PROCS`] once per process and later
//! invokes them with the opaque counterpart pointer, so every trampoline is
//! a free function with a stable address for the process lifetime; instance
//! identity is recovered through the handle registry, never captured.
//!
//! An identifier that is no longer registered means the pairing was already
//! torn down. For the eleven data operations that is a bridge protocol
//! violation and the trampoline panics - the `C-unwind` ABI carries the
//! failure to the caller instead of returning a silent wrong result. The
//! destroy trampoline is the one exception: a late or duplicate destroy
//! signal is expected and returns silently.

use std::ffi::c_void;
use std::sync::{Arc, Once};

use sable_engine_abi::{EngineVTable, RawStream, StreamProcs};

use crate::engine;
use crate::error::BridgeError;
use crate::registry::registry;
use crate::stream::{self, StreamEntry, TeardownOrigin};

/// The delegate table installed into the engine; 12 entries, fixed order.
pub static PROCS: StreamProcs = StreamProcs {
	read: read_proc,
	peek: peek_proc,
	is_at_end: is_at_end_proc,
	has_position: has_position_proc,
	has_length: has_length_proc,
	rewind: rewind_proc,
	get_position: get_position_proc,
	seek: seek_proc,
	move_by: move_proc,
	get_length: get_length_proc,
	create_new: create_new_proc,
	destroy: destroy_proc,
};

static INSTALL: Once = Once::new();

/// Installs [`PROCS`] into the engine's dispatch table once per process and
/// returns the engine vtable. Runs before any stream is constructed.
pub(crate) fn ensure_installed() -> Result<EngineVTable, BridgeError> {
	let vtable = engine::installed()?;
	INSTALL.call_once(|| {
		unsafe { (vtable.set_procs)(&PROCS) };
		tracing::debug!("stream.procs_installed");
	});
	Ok(vtable)
}

/// Resolves a live entry or panics: data trampolines must only ever be
/// dispatched on identifiers that are still registered.
pub(crate) fn resolve(raw: RawStream) -> Arc<StreamEntry> {
	registry()
		.get(raw as usize)
		.unwrap_or_else(|| panic!("stream callback dispatched on torn-down identifier {raw:p}"))
}

/// Reinterprets the engine-provided buffer. A null buffer is treated as a
/// zero-length request.
fn buffer_slice<'a>(buffer: *mut c_void, size: usize) -> &'a mut [u8] {
	if buffer.is_null() || size == 0 {
		return &mut [];
	}
	unsafe { std::slice::from_raw_parts_mut(buffer.cast::<u8>(), size) }
}

pub(crate) extern "C-unwind" fn read_proc(raw: RawStream, buffer: *mut c_void, size: usize) -> usize {
	let entry = resolve(raw);
	let mut source = entry.source().lock();
	source.read(buffer_slice(buffer, size))
}

pub(crate) extern "C-unwind" fn peek_proc(raw: RawStream, buffer: *mut c_void, size: usize) -> usize {
	let entry = resolve(raw);
	let mut source = entry.source().lock();
	source.peek(buffer_slice(buffer, size))
}

pub(crate) extern "C-unwind" fn is_at_end_proc(raw: RawStream) -> bool {
	resolve(raw).source().lock().is_at_end()
}

pub(crate) extern "C-unwind" fn has_position_proc(raw: RawStream) -> bool {
	resolve(raw).source().lock().has_position()
}

pub(crate) extern "C-unwind" fn has_length_proc(raw: RawStream) -> bool {
	resolve(raw).source().lock().has_length()
}

pub(crate) extern "C-unwind" fn rewind_proc(raw: RawStream) -> bool {
	resolve(raw).source().lock().rewind()
}

pub(crate) extern "C-unwind" fn get_position_proc(raw: RawStream) -> usize {
	resolve(raw).source().lock().position()
}

pub(crate) extern "C-unwind" fn seek_proc(raw: RawStream, position: usize) -> bool {
	resolve(raw).source().lock().seek(position)
}

pub(crate) extern "C-unwind" fn move_proc(raw: RawStream, offset: i32) -> bool {
	resolve(raw).source().lock().move_by(offset)
}

pub(crate) extern "C-unwind" fn get_length_proc(raw: RawStream) -> usize {
	resolve(raw).source().lock().length()
}

pub(crate) extern "C-unwind" fn create_new_proc(raw: RawStream) -> RawStream {
	let entry = resolve(raw);
	let duplicate = entry.source().lock().create_new();
	match duplicate {
		// The engine takes ownership of the duplicate and ends it with a
		// destroy signal; there is no host-side handle.
		Some(source) => match stream::register(source, true) {
			Ok(dup) => dup.id() as RawStream,
			Err(err) => panic!("failed to register duplicate stream: {err}"),
		},
		None => std::ptr::null_mut(),
	}
}

pub(crate) extern "C-unwind" fn destroy_proc(raw: RawStream) {
	// Unknown identifiers are a benign late signal here, not a violation.
	if let Some(entry) = registry().get(raw as usize) {
		entry.dispose(TeardownOrigin::Native);
	}
}
