//! Narrow-integer bridging variant of the callback layer.
//!
//! Some embeddings cannot hand the engine raw function addresses: calls are
//! routed through an intermediate runtime that only passes 32-bit integers
//! and refers to callbacks by slot. This module exports the same 12
//! operations as named shims with fixed-width parameters, and installs them
//! through the engine's slot-based entry point using values discovered from
//! a [`ProcRegistrar`] at runtime. The capability contract is identical to
//! the primary layer; only the marshalling differs.

use std::ffi::c_void;

use sable_engine_abi::{PROC_COUNT, RawStream};

use crate::engine;
use crate::error::BridgeError;
use crate::procs;

/// Runtime hook that registers the exported shims with the intermediate
/// bridge and reports the slot values assigned to them.
pub trait ProcRegistrar {
	/// Registers the 12 shims and returns their slot values as a
	/// comma-separated list, in delegate-table order.
	fn register(&self) -> String;
}

/// Installs the indexed callback slots into the engine.
///
/// The registrar must report exactly [`PROC_COUNT`] slots; any other count,
/// or an unparsable entry, is fatal for this subsystem.
pub fn install(registrar: &dyn ProcRegistrar) -> Result<(), BridgeError> {
	let vtable = engine::installed()?;
	let set_procs_indexed = vtable.set_procs_indexed.ok_or(BridgeError::IndexedUnsupported)?;
	let slots = parse_slots(&registrar.register())?;
	unsafe { set_procs_indexed(slots.as_ptr(), slots.len()) };
	tracing::debug!(?slots, "stream.procs_installed_indexed");
	Ok(())
}

/// Parses the registrar's comma-separated slot list, enforcing the count.
fn parse_slots(raw: &str) -> Result<Vec<u32>, BridgeError> {
	let mut slots = Vec::with_capacity(PROC_COUNT);
	for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
		let slot = entry
			.parse::<u32>()
			.map_err(|_| BridgeError::DelegateParse { entry: entry.to_string() })?;
		slots.push(slot);
	}
	if slots.len() != PROC_COUNT {
		return Err(BridgeError::DelegateCount {
			expected: PROC_COUNT,
			got: slots.len(),
		});
	}
	Ok(slots)
}

fn widen(stream: u32) -> RawStream {
	stream as usize as RawStream
}

// The shims narrow the primary trampolines to 32-bit parameters and returns.
// Buffers arrive as 32-bit addresses, which only round-trips on the 32-bit
// targets this variant exists for. Exported by name so the intermediate
// runtime can reference them without holding addresses.

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_read_indexed(stream: u32, buffer: u32, size: u32) -> u32 {
	procs::read_proc(widen(stream), buffer as usize as *mut c_void, size as usize) as u32
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_peek_indexed(stream: u32, buffer: u32, size: u32) -> u32 {
	procs::peek_proc(widen(stream), buffer as usize as *mut c_void, size as usize) as u32
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_is_at_end_indexed(stream: u32) -> bool {
	procs::is_at_end_proc(widen(stream))
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_has_position_indexed(stream: u32) -> bool {
	procs::has_position_proc(widen(stream))
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_has_length_indexed(stream: u32) -> bool {
	procs::has_length_proc(widen(stream))
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_rewind_indexed(stream: u32) -> bool {
	procs::rewind_proc(widen(stream))
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_get_position_indexed(stream: u32) -> u32 {
	procs::get_position_proc(widen(stream)) as u32
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_seek_indexed(stream: u32, position: u32) -> bool {
	procs::seek_proc(widen(stream), position as usize)
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_move_indexed(stream: u32, offset: i32) -> bool {
	procs::move_proc(widen(stream), offset)
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_get_length_indexed(stream: u32) -> u32 {
	procs::get_length_proc(widen(stream)) as u32
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_create_new_indexed(stream: u32) -> u32 {
	procs::create_new_proc(widen(stream)) as usize as u32
}

#[unsafe(no_mangle)]
pub extern "C-unwind" fn sable_stream_destroy_indexed(stream: u32) {
	procs::destroy_proc(widen(stream));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_exactly_twelve_slots() {
		let slots = parse_slots("1,2,3,4,5,6,7,8,9,10,11,12").expect("twelve slots parse");
		assert_eq!(slots, (1..=12).collect::<Vec<u32>>());
	}

	#[test]
	fn tolerates_whitespace_and_trailing_separator() {
		let slots = parse_slots(" 1, 2 ,3,4,5,6,7,8,9,10,11,12,").expect("padded list parses");
		assert_eq!(slots.len(), PROC_COUNT);
	}

	#[test]
	fn short_list_is_a_count_mismatch() {
		let err = parse_slots("1,2,3").expect_err("three slots must fail");
		assert!(matches!(err, BridgeError::DelegateCount { expected: 12, got: 3 }));
	}

	#[test]
	fn long_list_is_a_count_mismatch() {
		let err = parse_slots("1,2,3,4,5,6,7,8,9,10,11,12,13").expect_err("thirteen slots must fail");
		assert!(matches!(err, BridgeError::DelegateCount { expected: 12, got: 13 }));
	}

	#[test]
	fn non_numeric_entry_fails_parse() {
		let err = parse_slots("1,2,x,4,5,6,7,8,9,10,11,12").expect_err("junk entry must fail");
		assert!(matches!(err, BridgeError::DelegateParse { entry } if entry == "x"));
	}
}
