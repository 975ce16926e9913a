//! Walks every public payload produced over a week and checks that nothing
//! answer-bearing escapes while the answer is still live.

mod common;

use common::{CLOSES, Harness, OPENS, WEEK, drain};
use cryptic::cycle::Player;
use cryptic::phase::GenerateRequest;
use serde_json::Value;

const PHRASE: &str = "QUIXOTIC ZEPHYR 1987";
const ANSWER: &str = "QUIXOTICZEPHYR1987";

/// Keys that only private bundles carry.
const PRIVATE_KEYS: &[&str] = &[
    "legend",
    "reveal",
    "normalizedAnswer",
    "normalizedPhrase",
    "canonicalAnswer",
    "seed",
    "counts",
    "answer",
];

fn assert_clean(value: &Value, context: &str) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                assert!(
                    !PRIVATE_KEYS.contains(&key.as_str()),
                    "{context}: private key `{key}` in {value}"
                );
                assert_clean(child, context);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| assert_clean(item, context)),
        Value::String(s) => {
            assert!(!s.contains(ANSWER), "{context}: answer in {s}");
            assert!(!s.contains("QUIXOTIC"), "{context}: phrase word in {s}");
            assert!(!s.contains("ZEPHYR"), "{context}: phrase word in {s}");
        }
        _ => {}
    }
}

fn check_public_reads(h: &Harness, context: &str) {
    let state = serde_json::to_value(h.scheduler.read_public_state()).unwrap();
    assert_clean(&state, context);
    if let Some(cipher) = h.scheduler.read_public_cipher() {
        assert_clean(&serde_json::to_value(cipher).unwrap(), context);
    }
}

#[test]
fn live_answer_never_reaches_public_payloads() {
    let h = Harness::at(1);
    let (snapshot, mut rx) = h.scheduler.subscribe();
    assert_clean(&serde_json::to_value(snapshot).unwrap(), "initial snapshot");

    h.scheduler.tick();
    h.scheduler
        .generate_puzzle(&GenerateRequest {
            phrase: PHRASE.to_owned(),
            title: Some("T".to_owned()),
            hint: Some("H".to_owned()),
            seed: None,
        })
        .unwrap();
    check_public_reads(&h, "countdown");

    let player = Player::new("u1", "una");
    h.scheduler.grant_entry(0, &player.user_id).unwrap();
    for hours in [OPENS, OPENS + 1, CLOSES - 1] {
        h.tick_at(hours);
        check_public_reads(&h, "window");
    }
    h.scheduler.submit_answer(0, &player, PHRASE).unwrap();
    check_public_reads(&h, "after winning submission");

    // entrants of the live cycle only ever see the previous one
    assert!(h.scheduler.read_last_cycle_reveal(&player.user_id).is_none());

    for event in drain(&mut rx) {
        let value = serde_json::to_value(&event).unwrap();
        assert_clean(&value, event.kind());
    }

    // once closed, the reveal is allowed to carry it
    h.tick_at(CLOSES);
    h.scheduler.grant_entry(1, &player.user_id).unwrap();
    let reveal = h.scheduler.read_last_cycle_reveal(&player.user_id).unwrap();
    let reveal = serde_json::to_value(reveal).unwrap();
    assert_eq!(reveal["lastCipher"]["normalizedAnswer"], ANSWER);

    // but the broadcast stream still does not
    h.tick_at(WEEK + 1);
    for event in drain(&mut rx) {
        let value = serde_json::to_value(&event).unwrap();
        assert_clean(&value, event.kind());
    }
    check_public_reads(&h, "next countdown");
}

#[test]
fn rejections_are_indistinguishable() {
    let h = Harness::at(OPENS + 1);
    h.scheduler.tick();
    let entrant = Player::new("in", "in");
    h.scheduler.grant_entry(0, &entrant.user_id).unwrap();

    let stale = h.scheduler.submit_answer(9, &entrant, "x").unwrap_err();
    let outsider = h
        .scheduler
        .submit_answer(0, &Player::new("out", "out"), "x")
        .unwrap_err();
    // distinct for logs, identical on the wire
    assert_ne!(stale, outsider);

    let right = h
        .scheduler
        .submit_answer(0, &entrant, common::FALLBACK_PHRASE)
        .unwrap();
    let repeat = h.scheduler.submit_answer(0, &entrant, "wrong").unwrap();
    assert_eq!(
        serde_json::to_value(right).unwrap(),
        serde_json::to_value(repeat).unwrap()
    );
}
