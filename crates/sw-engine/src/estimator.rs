//! Improvement estimation and remediation choice
//!
//! The percentage is a ranking heuristic, not an optimizer prediction. It
//! only has to order queries sensibly and stay within `[0, 100]`.

use sw_core::{ColumnRef, QueryRecord, Remediation, TableInfo, TableKey, Tier};

const T1_UNINDEXED_PCT: f64 = 60.0;
const T1_INDEXED_PCT: f64 = 20.0;
const T2_INDEX_PCT: f64 = 40.0;
const T2_REFACTOR_PCT: f64 = 15.0;

/// Estimated gain and the fix expected to deliver it
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub improvement_pct: f64,
    pub remediation: Remediation,
}

/// Estimate the gain for one classified query.
///
/// A query counts as covered only when it filters on at least one column and
/// every such column is indexed on its table; everything else is expected to
/// gain from an index. `elapsed_share` is this query's fraction of the run's
/// total elapsed time and only affects T2 queries.
pub fn estimate(query: &QueryRecord, tier: Tier, tables: &[TableInfo], elapsed_share: f64) -> Estimate {
    let predicates: Vec<Predicate<'_>> = query
        .predicate_columns
        .iter()
        .map(|column| Predicate {
            owner: owning_table(query, column, tables),
            name: &column.name,
        })
        .collect();
    let uncovered: Vec<&Predicate<'_>> = predicates
        .iter()
        .filter(|p| !p.is_covered(tables))
        .collect();
    let index_expected = predicates.is_empty() || !uncovered.is_empty();

    let pct = match tier {
        Tier::T1 if index_expected => T1_UNINDEXED_PCT,
        Tier::T1 => T1_INDEXED_PCT,
        Tier::T2 => {
            let base = if index_expected {
                T2_INDEX_PCT
            } else {
                T2_REFACTOR_PCT
            };
            base * (0.5 + 0.5 * clamp_share(elapsed_share))
        }
    };

    Estimate {
        improvement_pct: pct.clamp(0.0, 100.0),
        remediation: index_target(&uncovered),
    }
}

/// A predicate column and the table it filters, when known
struct Predicate<'a> {
    owner: Option<&'a TableInfo>,
    name: &'a str,
}

impl Predicate<'_> {
    /// Indexed on its own table, or on any table when the owner is unknown
    fn is_covered(&self, tables: &[TableInfo]) -> bool {
        let indexed = |t: &TableInfo| {
            t.known_indexes
                .as_ref()
                .is_some_and(|cols| cols.contains(self.name))
        };
        match self.owner {
            Some(owner) => indexed(owner),
            None => tables.iter().any(indexed),
        }
    }
}

fn owning_table<'a>(query: &QueryRecord, column: &ColumnRef, tables: &'a [TableInfo]) -> Option<&'a TableInfo> {
    let owner = column.table.as_ref()?;
    let key = TableKey::new(query.lookup_schema(owner), owner.name.clone());
    tables.iter().find(|t| t.key == key)
}

/// Index the uncovered columns of the dominant table among those that own
/// one. Columns whose table cannot be told apart never pick a target.
fn index_target(uncovered: &[&Predicate<'_>]) -> Remediation {
    let owners: Vec<&TableInfo> = uncovered.iter().filter_map(|p| p.owner).collect();
    let Some(target) = dominant_table(&owners) else {
        return Remediation::Refactor;
    };
    let mut columns: Vec<String> = Vec::new();
    for p in uncovered {
        if p.owner.is_some_and(|o| o.key == target.key) && !columns.iter().any(|c| c == p.name) {
            columns.push(p.name.to_string());
        }
    }
    Remediation::CreateIndex {
        table: target.key.to_string(),
        columns,
    }
}

/// Each query's share of the total elapsed time, in input order.
///
/// When nothing was timed every query gets an equal share.
pub fn elapsed_shares(queries: &[QueryRecord]) -> Vec<f64> {
    let total: u128 = queries.iter().map(|q| u128::from(q.elapsed_us)).sum();
    if total == 0 {
        let even = 1.0 / queries.len().max(1) as f64;
        return vec![even; queries.len()];
    }
    queries
        .iter()
        .map(|q| q.elapsed_us as f64 / total as f64)
        .collect()
}

fn clamp_share(share: f64) -> f64 {
    if share.is_nan() {
        0.0
    } else {
        share.clamp(0.0, 1.0)
    }
}

/// Largest table, with unknown sizes counting as largest. Ties go to the
/// table referenced first.
fn dominant_table<'a>(tables: &[&'a TableInfo]) -> Option<&'a TableInfo> {
    tables
        .iter()
        .rev()
        .max_by_key(|t| t.size_bytes.unwrap_or(u64::MAX))
        .copied()
}

#[cfg(test)]
#[path = "estimator_test.rs"]
mod tests;
