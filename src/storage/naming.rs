use super::Storage;
use crate::error::StorageError;

/// File name prefix for numbered recordings (`record_1.wav`, `record_2.wav`, ...)
pub const RECORDING_PREFIX: &str = "record_";

/// First `record_N.wav` (N >= 1) that does not exist yet
pub fn next_recording_name(storage: &dyn Storage) -> String {
    let mut number: u32 = 1;
    loop {
        let name = format!("{}{}.wav", RECORDING_PREFIX, number);
        if !storage.exists(&name) {
            return name;
        }
        number += 1;
    }
}

/// Highest-numbered `record_N.wav` in the store, if any
pub fn latest_recording(storage: &dyn Storage) -> Result<Option<String>, StorageError> {
    let latest = storage
        .list()?
        .into_iter()
        .filter_map(|name| recording_number(&name).map(|n| (n, name)))
        .max_by_key(|(n, _)| *n)
        .map(|(_, name)| name);

    Ok(latest)
}

fn recording_number(name: &str) -> Option<u32> {
    name.strip_prefix(RECORDING_PREFIX)?
        .strip_suffix(".wav")?
        .parse()
        .ok()
}
