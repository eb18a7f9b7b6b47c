use super::*;
use chrono::TimeZone;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, h, m, 0).unwrap()
}

fn midnight() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 0, 0).unwrap()
}

#[test]
fn test_six_hour_slots() {
    assert_eq!(next_run_after(at(0, 1), 6, midnight()), at(6, 0));
    assert_eq!(next_run_after(at(13, 45), 6, midnight()), at(18, 0));
}

#[test]
fn test_exact_slot_moves_to_next() {
    assert_eq!(next_run_after(at(6, 0), 6, midnight()), at(12, 0));
}

#[test]
fn test_rolls_over_midnight() {
    let next = next_run_after(at(19, 0), 6, midnight());
    assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap());
}

#[test]
fn test_anchor_later_than_now() {
    let anchor = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
    // Slots: ..., 20:30 (prev day), 02:30, 08:30, ...
    assert_eq!(next_run_after(at(1, 0), 6, anchor), at(2, 30));
    assert_eq!(next_run_after(at(3, 0), 6, anchor), at(8, 30));
}

#[test]
fn test_until_next_run() {
    let wait = until_next_run(at(5, 30), 6, midnight());
    assert_eq!(wait, std::time::Duration::from_secs(30 * 60));
}
