//! Record merging and deduplication by fingerprint.
//!
//! Folds the records of every completed backend into one list where each
//! logical patent appears once. Multi-valued fields are unioned and scalar
//! text fields are filled forward: the first non-empty value seen is kept.
//!
//! Two different non-empty abstracts (or claims, descriptions) for the same
//! fingerprint are not reconciled; the earlier one in the working sequence
//! wins silently.

use std::collections::{BTreeMap, HashMap};

use crate::types::{BackendResult, DatabaseId, PatentRecord};

use super::fingerprint::{fingerprint, Fingerprint};

/// Flatten completed backend results into the merge working sequence.
///
/// Backends are visited in `order`; ids in `order` with no entry in
/// `results`, and failed results, contribute nothing. Each record is tagged
/// with its originating database before it is emitted. Records keep their
/// backend-reported order.
pub fn working_sequence(
    results: &BTreeMap<DatabaseId, BackendResult>,
    order: &[DatabaseId],
) -> Vec<PatentRecord> {
    order
        .iter()
        .filter_map(|id| results.get(id))
        .filter(|result| result.is_completed())
        .flat_map(|result| {
            result.records.iter().map(|record| {
                let mut tagged = record.clone();
                tagged.source_databases.insert(result.database_id.clone());
                tagged
            })
        })
        .collect()
}

/// Deduplicate `records` by fingerprint in a single pass.
///
/// The output keeps first-seen order. For a repeated fingerprint the
/// existing entry absorbs the newcomer via [`merge_into`].
pub fn merge_records(records: Vec<PatentRecord>) -> Vec<PatentRecord> {
    let mut merged: Vec<PatentRecord> = Vec::with_capacity(records.len());
    let mut index: HashMap<Fingerprint, usize> = HashMap::with_capacity(records.len());

    for record in records {
        let key = fingerprint(&record);
        match index.get(&key) {
            Some(&slot) => merge_into(&mut merged[slot], record),
            None => {
                index.insert(key, merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

/// Merge `incoming` into `existing`, which share a fingerprint.
///
/// - `source_databases`, `inventors`, `applicants`, `ipc_classes`, `images`:
///   set union.
/// - `abstract`, `claims`, `description`, `source_url`: filled only while
///   the existing value is missing or empty.
/// - `patent_number` and `title` keep the existing spelling.
pub fn merge_into(existing: &mut PatentRecord, incoming: PatentRecord) {
    existing.source_databases.extend(incoming.source_databases);
    existing.inventors.extend(incoming.inventors);
    existing.applicants.extend(incoming.applicants);
    existing.ipc_classes.extend(incoming.ipc_classes);
    existing.images.extend(incoming.images);

    fill_forward(&mut existing.abstract_text, incoming.abstract_text);
    fill_forward(&mut existing.claims, incoming.claims);
    fill_forward(&mut existing.description, incoming.description);
    fill_forward(&mut existing.source_url, incoming.source_url);
}

fn fill_forward(slot: &mut Option<String>, candidate: Option<String>) {
    if is_empty(slot) && !is_empty(&candidate) {
        *slot = candidate;
    }
}

fn is_empty(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}
