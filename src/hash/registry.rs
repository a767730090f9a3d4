//! Process-wide hash engine registry.
//!
//! The registry maps ids `0..=200` to custom [`HashEngine`] implementations.
//! It is initialized lazily on first use, shared by every filter in the
//! process, and lives until process exit. Reads vastly outnumber writes
//! (one `register` per engine, one `resolve` per filter construction or
//! decode), so a plain `RwLock` around the map is enough.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{BloomWireError, Result};

use super::engines::{ExtendedEngine, NarrowEngine, WideEngine};
use super::{HashEngine, EXTENDED_HASH_ID, MAX_CUSTOM_HASH_ID, NARROW_HASH_ID, WIDE_HASH_ID};

type EngineMap = HashMap<u8, Arc<dyn HashEngine>>;

static CUSTOM_ENGINES: OnceLock<RwLock<EngineMap>> = OnceLock::new();

fn custom_engines() -> &'static RwLock<EngineMap> {
    CUSTOM_ENGINES.get_or_init(|| RwLock::new(HashMap::new()))
}

// A poisoned registry lock only means some registering thread panicked;
// the map itself is never left mid-update, so reads may proceed.
fn read_engines() -> RwLockReadGuard<'static, EngineMap> {
    match custom_engines().read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_engines() -> RwLockWriteGuard<'static, EngineMap> {
    match custom_engines().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Install a custom hash engine under `id`.
///
/// Ids `0..=200` are available for custom engines; registering an id twice
/// replaces the previous engine (filters already holding the old engine are
/// unaffected). Filters built with a custom id can only be decoded in
/// processes that registered the same id first.
///
/// # Errors
///
/// [`BloomWireError::InvalidParameters`] if `id` is above
/// [`MAX_CUSTOM_HASH_ID`]: ids 201..=203 are the frozen built-ins and
/// 204..=255 are reserved.
pub fn register(id: u8, engine: Arc<dyn HashEngine>) -> Result<()> {
    if id > MAX_CUSTOM_HASH_ID {
        return Err(BloomWireError::invalid_parameters(format!(
            "hash id {id} is outside the custom range 0..={MAX_CUSTOM_HASH_ID}"
        )));
    }
    write_engines().insert(id, engine);
    Ok(())
}

/// Resolve an id to its engine: built-ins for 201..=203, the registry for
/// custom ids.
///
/// # Errors
///
/// [`BloomWireError::UnknownHashId`] for unregistered custom ids and for
/// every reserved id.
pub fn resolve(id: u8) -> Result<Arc<dyn HashEngine>> {
    match id {
        NARROW_HASH_ID => Ok(Arc::new(NarrowEngine)),
        WIDE_HASH_ID => Ok(Arc::new(WideEngine)),
        EXTENDED_HASH_ID => Ok(Arc::new(ExtendedEngine)),
        id if id <= MAX_CUSTOM_HASH_ID => read_engines()
            .get(&id)
            .cloned()
            .ok_or_else(|| BloomWireError::unknown_hash_id(id)),
        id => Err(BloomWireError::unknown_hash_id(id)),
    }
}
