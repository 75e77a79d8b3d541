//! Periodic interrupt scenarios.
//!
//! # Acceptance Criteria
//!
//! - A word registered at 350 ms against a 100 ms base fires every 3 ticks
//! - A zero period removes the registration for good
//! - One `service` call fires a due word once, however many ticks elapsed
//! - Servicing after every tick fires `floor(n / k)` times

use super::common::{ms, ready_bridge};
use bridge_common::WordId;
use bridge_core::{period_ticks, HostAdapter};
use std::time::Duration;

#[test]
fn test_word_7_at_350ms_fires_every_third_tick() {
    let mut bridge = ready_bridge();
    let ticks = bridge.tick_handle();

    bridge.set_period(WordId(7), ms(350)).unwrap();
    let entry = bridge.registry().entry(WordId(7)).unwrap();
    assert_eq!(entry.period_ticks, 3);
    assert_eq!(entry.counter, 0);

    for _ in 0..3 {
        ticks.tick();
    }
    assert_eq!(bridge.service().unwrap(), 1);
    assert_eq!(bridge.interpreter().fired, vec![WordId(7)]);
    assert_eq!(bridge.registry().entry(WordId(7)).unwrap().counter, 0);

    ticks.tick();
    ticks.tick();
    assert_eq!(bridge.service().unwrap(), 0);
    assert_eq!(bridge.interpreter().fire_count(WordId(7)), 1);
}

#[test]
fn test_zero_period_deregisters_word_9() {
    let mut bridge = ready_bridge();
    let ticks = bridge.tick_handle();

    bridge.set_period(WordId(9), ms(200)).unwrap();
    bridge.set_period(WordId(9), Duration::ZERO).unwrap();
    assert!(bridge.registry().entry(WordId(9)).is_none());

    for _ in 0..20 {
        ticks.tick();
        bridge.run_cycle().unwrap();
    }
    assert_eq!(bridge.interpreter().fire_count(WordId(9)), 0);
}

#[test]
fn test_single_service_resets_once() {
    for n in 0..12u64 {
        let mut bridge = ready_bridge();
        let ticks = bridge.tick_handle();
        bridge.set_period(WordId(1), ms(300)).unwrap();

        for _ in 0..n {
            ticks.tick();
        }
        let fired = bridge.service().unwrap();

        let expected = usize::from(n >= 3);
        assert_eq!(fired, expected, "n = {n}");
        assert_eq!(bridge.registry().entry(WordId(1)).unwrap().counter, if n >= 3 { 0 } else { n });
    }
}

#[test]
fn test_service_per_tick_fires_floor_n_over_k() {
    for k in 1..=4u64 {
        for n in 0..15u64 {
            let mut bridge = ready_bridge();
            let ticks = bridge.tick_handle();
            bridge.set_period(WordId(2), ms(100 * k)).unwrap();

            for _ in 0..n {
                ticks.tick();
                bridge.service().unwrap();
            }

            let fired = bridge.interpreter().fire_count(WordId(2)) as u64;
            assert_eq!(fired, n / k, "n = {n}, k = {k}");
        }
    }
}

#[test]
fn test_one_entry_per_word_with_last_period() {
    let mut bridge = ready_bridge();
    let requests = [
        (1, 500),
        (2, 100),
        (1, 250),
        (3, 0),
        (2, 0),
        (1, 999),
        (2, 40),
    ];

    for (word, period) in requests {
        bridge.set_period(WordId(word), ms(period)).unwrap();
    }

    let entries = bridge.registry().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].word, WordId(1));
    assert_eq!(Some(entries[0].period_ticks), period_ticks(ms(999), ms(100)));
    assert_eq!(entries[1].word, WordId(2));
    assert_eq!(entries[1].period_ticks, 1);
}

#[test]
fn test_host_adapter_registration() {
    let mut bridge = ready_bridge();
    let ticks = bridge.tick_handle();

    HostAdapter::new(&mut bridge).set_period_ms(7, 350).unwrap();
    for _ in 0..3 {
        ticks.tick();
    }
    let report = bridge.run_cycle().unwrap();

    assert_eq!(report.fired, 1);
    assert_eq!(bridge.interpreter().fired, vec![WordId(7)]);
}
