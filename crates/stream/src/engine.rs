//! Process-wide installation of the native engine's entry points.
//!
//! Installation happens once, before the first stream is constructed. The
//! vtable is immutable afterwards; a second install is an error so a
//! misconfigured host fails loudly instead of silently keeping whichever
//! table arrived first.

use std::path::Path;
use std::sync::OnceLock;

use libloading::Library;
use sable_engine_abi::{AbiError, EngineVTable};

use crate::error::BridgeError;

static ENGINE: OnceLock<EngineVTable> = OnceLock::new();
static ENGINE_LIB: OnceLock<Library> = OnceLock::new();

/// Installs the engine vtable for the process lifetime.
pub fn install(vtable: EngineVTable) -> Result<(), BridgeError> {
	ENGINE.set(vtable).map_err(|_| BridgeError::EngineAlreadyInstalled)?;
	tracing::debug!("stream.engine_installed");
	Ok(())
}

/// Loads the engine library at `path`, resolves its stream entry points, and
/// installs them. The library stays resident for the process lifetime so the
/// resolved addresses remain valid.
pub fn install_from_path(path: &Path) -> Result<(), BridgeError> {
	let lib = unsafe { Library::new(path) }.map_err(AbiError::from)?;
	let vtable = unsafe { EngineVTable::from_library(&lib)? };
	install(vtable)?;
	let _ = ENGINE_LIB.set(lib);
	Ok(())
}

/// The installed vtable, or an error when installation has not happened yet.
pub(crate) fn installed() -> Result<EngineVTable, BridgeError> {
	ENGINE.get().copied().ok_or(BridgeError::EngineNotInstalled)
}

#[cfg(test)]
mod tests {
	use super::*;

	// No unit test in this binary installs the engine; the installed path is
	// covered by the integration suite with its recording double.
	#[test]
	fn vtable_is_absent_until_installed() {
		assert!(matches!(installed(), Err(BridgeError::EngineNotInstalled)));
	}
}
