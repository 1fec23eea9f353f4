//! Shared validation for caller-supplied link metadata.

use std::collections::BTreeMap;
use validator::ValidationError;

const MAX_ENTRIES: usize = 20;
const MAX_KEY_LEN: usize = 64;
const MAX_VALUE_LEN: usize = 512;

pub fn validate_metadata(metadata: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    if metadata.len() > MAX_ENTRIES {
        return Err(ValidationError::new("too_many_entries"));
    }

    let oversized = metadata
        .iter()
        .any(|(k, v)| k.is_empty() || k.len() > MAX_KEY_LEN || v.len() > MAX_VALUE_LEN);
    if oversized {
        return Err(ValidationError::new("entry_size"));
    }

    Ok(())
}
