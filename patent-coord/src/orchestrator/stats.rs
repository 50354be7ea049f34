//! Aggregate counts and deduplication ratio for a coordination run.
//!
//! Computed once, after the merge step, and never mutated afterwards.
//!
//! ```text
//! dedup_ratio = (total_original - total_merged) / total_original
//! dedup_ratio = 0.0                    when total_original == 0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{BackendResult, DatabaseId};

/// Original vs deduplicated record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeduplicationStats {
    pub original_count: usize,
    pub deduplicated_count: usize,
    pub duplicates_removed: usize,
}

/// Derived statistics for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_databases_searched: usize,
    /// Records per database; failed databases count 0.
    pub per_database_counts: BTreeMap<DatabaseId, usize>,
    pub total_found: usize,
    pub merged_count: usize,
    pub dedup_ratio: f64,
    pub total_files_downloaded: usize,
    pub deduplication_stats: DeduplicationStats,
}

/// Fraction of original records eliminated by merging.
///
/// Returns `0.0` when `total_original` is zero. The result is clamped to
/// `0.0..=1.0` so a caller passing `total_merged > total_original` cannot
/// produce a negative ratio.
pub fn dedup_ratio(total_original: usize, total_merged: usize) -> f64 {
    if total_original == 0 {
        return 0.0;
    }
    let removed = total_original.saturating_sub(total_merged);
    removed as f64 / total_original as f64
}

/// Derive run statistics from the per-database results and the merged count.
pub fn collect_statistics(
    results: &BTreeMap<DatabaseId, BackendResult>,
    merged_count: usize,
) -> Statistics {
    let per_database_counts: BTreeMap<DatabaseId, usize> = results
        .iter()
        .map(|(id, result)| (id.clone(), result.contributed_count()))
        .collect();
    let total_found: usize = per_database_counts.values().sum();
    let total_files_downloaded = results
        .values()
        .map(|result| result.downloaded_artifacts.len())
        .sum();

    Statistics {
        total_databases_searched: results.len(),
        per_database_counts,
        total_found,
        merged_count,
        dedup_ratio: dedup_ratio(total_found, merged_count),
        total_files_downloaded,
        deduplication_stats: DeduplicationStats {
            original_count: total_found,
            deduplicated_count: merged_count,
            duplicates_removed: total_found.saturating_sub(merged_count),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendStatus, PatentRecord};
    use std::path::PathBuf;
    use std::time::Duration;

    fn completed(id: &str, n: usize) -> BackendResult {
        BackendResult {
            database_id: DatabaseId::new(id),
            status: BackendStatus::Completed,
            records: (0..n)
                .map(|i| PatentRecord::new(format!("{id}{i}"), "t"))
                .collect(),
            downloaded_artifacts: vec![PathBuf::from(format!("/tmp/{id}.pdf"))],
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn ratio_zero_when_nothing_found() {
        assert!((dedup_ratio(0, 0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ratio_formula() {
        assert!((dedup_ratio(10, 7) - 0.3).abs() < 1e-12);
        assert!((dedup_ratio(4, 4) - 0.0).abs() < f64::EPSILON);
        assert!((dedup_ratio(4, 0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ratio_stays_in_unit_interval() {
        for original in 1..20usize {
            for merged in 0..25usize {
                let ratio = dedup_ratio(original, merged);
                assert!((0.0..=1.0).contains(&ratio), "{original}/{merged} -> {ratio}");
            }
        }
    }

    #[test]
    fn failed_databases_count_zero() {
        let mut results = BTreeMap::new();
        results.insert(DatabaseId::new("uspto"), completed("uspto", 3));
        results.insert(
            DatabaseId::new("epo"),
            BackendResult::unsupported(DatabaseId::new("epo")),
        );

        let stats = collect_statistics(&results, 2);
        assert_eq!(stats.total_databases_searched, 2);
        assert_eq!(stats.per_database_counts[&DatabaseId::new("uspto")], 3);
        assert_eq!(stats.per_database_counts[&DatabaseId::new("epo")], 0);
        assert_eq!(stats.total_found, 3);
        assert_eq!(stats.merged_count, 2);
        assert_eq!(stats.total_files_downloaded, 1);
        assert_eq!(stats.deduplication_stats.duplicates_removed, 1);
        assert!((stats.dedup_ratio - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_results_give_zero_statistics() {
        let stats = collect_statistics(&BTreeMap::new(), 0);
        assert_eq!(stats, Statistics::default());
    }
}
