use super::*;
use crate::test_utils::{query, GIB, MIB};
use sw_core::TableKey;

fn sized(size: Option<u64>) -> TableInfo {
    TableInfo::resolved(TableKey::new(None, "T"), size, None, 10 * MIB)
}

fn score_for(executions: u64, tier: Tier, size: Option<u64>) -> u8 {
    let q = query("SELECT * FROM t", None, executions, 1);
    score(&q, tier, &[sized(size)], 10)
}

#[test]
fn test_small_rare_query_scores_one() {
    assert_eq!(score_for(5, Tier::T1, Some(2 * MIB)), 1);
}

#[test]
fn test_large_frequent_query_hits_ceiling() {
    // 5 base + 2 frequency + 3 size
    assert_eq!(score_for(500, Tier::T2, Some(15 * GIB)), 10);
}

#[test]
fn test_frequency_bonus_per_order_of_magnitude() {
    assert_eq!(score_for(9, Tier::T1, Some(MIB)), 1);
    assert_eq!(score_for(10, Tier::T1, Some(MIB)), 2);
    assert_eq!(score_for(99, Tier::T1, Some(MIB)), 2);
    assert_eq!(score_for(100, Tier::T1, Some(MIB)), 3);
    assert_eq!(score_for(1_000_000, Tier::T1, Some(MIB)), 7);
}

#[test]
fn test_size_bonus_applies_to_t2_only() {
    assert_eq!(score_for(1, Tier::T2, Some(GIB)), 5);
    assert_eq!(score_for(1, Tier::T2, Some(GIB + 1)), 6);
    assert_eq!(score_for(1, Tier::T2, Some(10 * GIB + 1)), 8);
    assert_eq!(score_for(1, Tier::T2, None), 5);
    assert_eq!(score_for(1, Tier::T1, Some(20 * GIB)), 1);
}

#[test]
fn test_bonuses_above_ceiling_are_clamped() {
    assert_eq!(score_for(u64::MAX, Tier::T2, Some(u64::MAX)), 10);
    let q = query("SELECT * FROM t", None, 1000, 1);
    assert_eq!(score(&q, Tier::T2, &[sized(Some(20 * GIB))], 7), 7);
}

#[test]
fn test_largest_table_drives_size_bonus() {
    let q = query("SELECT * FROM a, b", None, 1, 1);
    let tables = [sized(Some(MIB)), sized(None), sized(Some(2 * GIB))];
    assert_eq!(score(&q, Tier::T2, &tables, 10), 6);
}

#[test]
fn test_monotonic_in_executions_and_size() {
    let sizes = [None, Some(MIB), Some(GIB), Some(2 * GIB), Some(11 * GIB)];
    let counts = [0, 1, 9, 10, 50, 100, 5_000, 1_000_000];
    for tier in [Tier::T1, Tier::T2] {
        for size in sizes {
            let scores: Vec<u8> = counts.iter().map(|&n| score_for(n, tier, size)).collect();
            assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{tier} {size:?}: {scores:?}");
        }
        for n in counts {
            let scores: Vec<u8> = sizes[1..].iter().map(|&s| score_for(n, tier, s)).collect();
            assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{tier} {n}: {scores:?}");
        }
    }
}
