//! Recursive document merge.
//!
//! Maps merge key by key. Any other patch value replaces the destination
//! value at the same path. A map meeting a sequence is a conflict.

use super::kind_name;
use crate::error::DocumentError;
use serde_yaml::{Mapping, Value};

pub(crate) fn merge_mapping(
    dest: &mut Mapping,
    patch: &Mapping,
    path: &mut Vec<String>,
) -> Result<(), DocumentError> {
    for (key, patch_value) in patch {
        path.push(key_label(key));
        match dest.get_mut(key) {
            Some(dest_value) => merge_value(dest_value, patch_value, path)?,
            None => {
                dest.insert(key.clone(), patch_value.clone());
            }
        }
        path.pop();
    }
    Ok(())
}

fn merge_value(
    dest: &mut Value,
    patch: &Value,
    path: &mut Vec<String>,
) -> Result<(), DocumentError> {
    if let (Value::Mapping(dest_map), Value::Mapping(patch_map)) = (&mut *dest, patch) {
        return merge_mapping(dest_map, patch_map, path);
    }

    let conflicting = (dest.is_mapping() && patch.is_sequence())
        || (dest.is_sequence() && patch.is_mapping());
    if conflicting {
        return Err(DocumentError::MergeConflict {
            path: path.join("."),
            destination: kind_name(dest),
            patch: kind_name(patch),
        });
    }

    *dest = patch.clone();
    Ok(())
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => kind_name(other).to_string(),
    }
}
