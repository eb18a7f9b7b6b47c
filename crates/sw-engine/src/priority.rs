//! Urgency scoring

use sw_core::{QueryRecord, TableInfo, Tier};

const GIB: u64 = 1024 * 1024 * 1024;

/// Score a query from 1 (low) to `max_priority` (at most 10).
///
/// T2 queries start at 5, T1 at 1. Every order of magnitude of executions
/// from 10 upward adds one point. For T2, the largest known table adds one
/// point above 1 GiB and three above 10 GiB. Unknown sizes earn no size
/// bonus. The total is clamped rather than rejected.
pub fn score(query: &QueryRecord, tier: Tier, tables: &[TableInfo], max_priority: u8) -> u8 {
    let mut points: u32 = match tier {
        Tier::T1 => 1,
        Tier::T2 => 5,
    };
    points += frequency_bonus(query.executions);
    if tier == Tier::T2 {
        points += size_bonus(largest_known_size(tables));
    }
    let ceiling = u32::from(max_priority.clamp(1, sw_core::config::PRIORITY_CEILING));
    points.clamp(1, ceiling) as u8
}

fn frequency_bonus(executions: u64) -> u32 {
    if executions < 10 {
        0
    } else {
        executions.ilog10()
    }
}

fn size_bonus(largest: Option<u64>) -> u32 {
    match largest {
        Some(size) if size > 10 * GIB => 3,
        Some(size) if size > GIB => 1,
        _ => 0,
    }
}

fn largest_known_size(tables: &[TableInfo]) -> Option<u64> {
    tables.iter().filter_map(|t| t.size_bytes).max()
}

#[cfg(test)]
#[path = "priority_test.rs"]
mod tests;
