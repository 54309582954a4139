//! Duplicate story detection.

use super::naming::normalize_key;
use super::{EntryDataSet, EntryDatum};
use crate::error::{CollidingStory, DuplicateError, KeyCollision};
use rustc_hash::FxHashMap as HashMap;

/// Fail when two stories share a normalized key.
///
/// Entries from different files always collide. Within one file, entries
/// collide only when they come from different bindings; aliases of a single
/// export are the same story.
pub fn validate(set: &EntryDataSet) -> Result<(), DuplicateError> {
    let mut groups: Vec<(String, Vec<&EntryDatum>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::default();

    for entry in set {
        let key = normalize_key(&entry.key);
        if let Some(&i) = index.get(&key) {
            groups[i].1.push(entry);
        } else {
            index.insert(key.clone(), groups.len());
            groups.push((key, vec![entry]));
        }
    }

    let collisions: Vec<KeyCollision> = groups
        .into_iter()
        .filter(|(_, entries)| is_collision(entries))
        .map(|(key, entries)| KeyCollision {
            key,
            stories: entries
                .iter()
                .map(|e| CollidingStory {
                    file_path: e.file_path.clone(),
                    export_name: e.export_name.clone(),
                })
                .collect(),
        })
        .collect();

    if collisions.is_empty() {
        Ok(())
    } else {
        Err(DuplicateError { collisions })
    }
}

fn is_collision(entries: &[&EntryDatum]) -> bool {
    let first = entries[0];
    entries
        .iter()
        .any(|e| e.file_path != first.file_path || e.local != first.local)
}
