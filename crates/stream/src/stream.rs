//! Stream capability contract and the registration/teardown protocol.
//!
//! A [`BridgedStream`] pairs a Rust [`StreamSource`] with a native
//! counterpart object allocated by the engine. Either side may end the
//! pairing: the host by dropping (or explicitly disposing) the handle, the
//! engine by invoking the destroy callback. Both paths race on one atomic
//! compare-and-set of the teardown origin, so the counterpart is destroyed
//! at most once and a re-entrant destroy signal can never deadlock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use sable_engine_abi::{EngineVTable, RawStream};

use crate::error::BridgeError;
use crate::procs;
use crate::registry::registry;

/// The operation set every bridged stream implementation provides.
///
/// Implementations are single-owner: the bridge serializes all dispatch to
/// one instance, but calls may arrive on engine-owned threads. Every
/// operation is expected to complete synchronously; bridging blocking I/O
/// into this layer is the implementation's concern, not the bridge's.
pub trait StreamSource: Send {
	/// Reads up to `buf.len()` bytes, advancing the position.
	///
	/// Returns the number of bytes actually read; 0 at end of stream. Must
	/// never read past the end of the underlying source.
	fn read(&mut self, buf: &mut [u8]) -> usize;

	/// Like [`read`](Self::read) but must not advance the logical position.
	fn peek(&mut self, buf: &mut [u8]) -> usize;

	/// Returns true once the position has reached the end of the source.
	fn is_at_end(&self) -> bool;

	/// Returns true if the stream can report and change its position.
	fn has_position(&self) -> bool;

	/// Returns true if the stream can report its total length.
	fn has_length(&self) -> bool;

	/// Resets the position to the start. False if unsupported or failed.
	fn rewind(&mut self) -> bool;

	/// Current position. Callers check [`has_position`](Self::has_position) first.
	fn position(&self) -> usize;

	/// Seeks to an absolute position.
	fn seek(&mut self, position: usize) -> bool;

	/// Moves the position by a relative offset.
	fn move_by(&mut self, offset: i32) -> bool;

	/// Total length. Callers check [`has_length`](Self::has_length) first.
	fn length(&self) -> usize;

	/// Produces an independent duplicate positioned at the start.
	///
	/// `None` signals that duplication is unsupported; the engine sees a
	/// null counterpart in that case.
	fn create_new(&self) -> Option<Box<dyn StreamSource>>;
}

/// Which side first signalled that a pairing should be torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TeardownOrigin {
	/// No teardown has been signalled.
	Live = 0,
	/// Host-side disposal (explicit or drop) won the race.
	Managed = 1,
	/// The engine's destroy signal won the race.
	Native = 2,
}

impl TeardownOrigin {
	fn from_raw(raw: u8) -> Self {
		match raw {
			1 => TeardownOrigin::Managed,
			2 => TeardownOrigin::Native,
			_ => TeardownOrigin::Live,
		}
	}
}

/// Live registry entry for one bridged stream.
pub(crate) struct StreamEntry {
	/// Native counterpart pointer, stored as an integer so the entry is
	/// `Send + Sync`.
	id: usize,
	/// Whether host-side disposal should destroy the native counterpart.
	owns: bool,
	/// Teardown origin, advanced from `Live` exactly once by compare-and-set.
	teardown: AtomicU8,
	/// Entry points of the engine that allocated the counterpart.
	vtable: EngineVTable,
	/// The user implementation; dispatch serializes through this lock.
	source: Mutex<Box<dyn StreamSource>>,
}

impl StreamEntry {
	pub(crate) fn new(id: usize, owns: bool, vtable: EngineVTable, source: Box<dyn StreamSource>) -> Self {
		Self {
			id,
			owns,
			teardown: AtomicU8::new(TeardownOrigin::Live as u8),
			vtable,
			source: Mutex::new(source),
		}
	}

	pub(crate) fn id(&self) -> usize {
		self.id
	}

	pub(crate) fn source(&self) -> &Mutex<Box<dyn StreamSource>> {
		&self.source
	}

	pub(crate) fn origin(&self) -> TeardownOrigin {
		TeardownOrigin::from_raw(self.teardown.load(Ordering::SeqCst))
	}

	/// Claims teardown for `origin`. Returns true for the single winner.
	///
	/// One compare-and-set rather than a lock: a destroy signal arriving
	/// re-entrantly on an engine thread must never deadlock against a
	/// host-side dispose.
	pub(crate) fn begin_teardown(&self, origin: TeardownOrigin) -> bool {
		self.teardown
			.compare_exchange(
				TeardownOrigin::Live as u8,
				origin as u8,
				Ordering::SeqCst,
				Ordering::SeqCst,
			)
			.is_ok()
	}

	/// Runs the disposal path for the given origin.
	///
	/// The winner removes the registry entry; only a host-origin winner that
	/// owns the counterpart issues the engine destroy call. When the signal
	/// came from the engine, the counterpart is already gone.
	pub(crate) fn dispose(&self, origin: TeardownOrigin) {
		if !self.begin_teardown(origin) {
			return;
		}
		registry().remove(self.id);
		if origin == TeardownOrigin::Managed && self.owns {
			unsafe { (self.vtable.stream_destroy)(self.id as RawStream) };
		}
		tracing::debug!(id = self.id, ?origin, "stream.dispose");
	}
}

/// Allocates a native counterpart, registers the pairing, and returns the
/// live entry. Shared by handle construction and duplicate registration.
pub(crate) fn register(source: Box<dyn StreamSource>, owns: bool) -> Result<Arc<StreamEntry>, BridgeError> {
	let vtable = procs::ensure_installed()?;
	let raw = unsafe { (vtable.stream_new)() };
	if raw.is_null() {
		return Err(BridgeError::AllocationFailed);
	}
	let id = raw as usize;
	let entry = Arc::new(StreamEntry::new(id, owns, vtable, source));
	registry().insert(id, Arc::clone(&entry));
	tracing::debug!(id, owns, "stream.register");
	Ok(entry)
}

/// Owning handle for a Rust stream registered with the native engine.
///
/// Construction allocates the native counterpart and publishes the registry
/// entry before the identifier can reach engine code. Dropping the handle
/// (or calling [`dispose`](Self::dispose)) runs the host-initiated teardown
/// path; if the engine signalled destroy first, that drop is a no-op.
pub struct BridgedStream {
	entry: Arc<StreamEntry>,
}

impl BridgedStream {
	/// Registers `source` with an owning native counterpart.
	pub fn new(source: impl StreamSource + 'static) -> Result<Self, BridgeError> {
		Self::with_ownership(source, true)
	}

	/// Registers `source`, optionally without ownership of the counterpart.
	///
	/// A non-owning stream never issues the engine destroy call; use this
	/// when the engine is known to own the counterpart's lifetime.
	pub fn with_ownership(source: impl StreamSource + 'static, owns: bool) -> Result<Self, BridgeError> {
		let entry = register(Box::new(source), owns)?;
		Ok(Self { entry })
	}

	/// The native identifier, for handing this stream to engine APIs.
	pub fn raw(&self) -> RawStream {
		self.entry.id() as RawStream
	}

	/// Which side, if any, has torn this pairing down.
	pub fn teardown_origin(&self) -> TeardownOrigin {
		self.entry.origin()
	}

	/// Explicit host-initiated disposal. Equivalent to dropping the handle.
	pub fn dispose(self) {}
}

impl Drop for BridgedStream {
	fn drop(&mut self) {
		self.entry.dispose(TeardownOrigin::Managed);
	}
}
