//! Gap-detection properties of the update counters.

use tangram_client::updates::{GateCheck, UpdateState};

/// Feeding a pts stream with jumps must never advance the counter past a gap
/// without a difference fetch filling it in first.
#[test]
fn pts_never_skips_a_gap() {
    let mut state = UpdateState::default();
    state.pts = 100;
    let mut difference_fetches = 0;

    // (new_pts, pts_count) events, including a jump and a duplicate.
    let events = [
        (101, 1),
        (102, 1),
        (105, 1), // gap: 103..104 missing
        (103, 1), // would have been in order, but the fetch already covered it
        (106, 1),
        (102, 1), // stale duplicate
        (107, 1),
    ];

    for (new_pts, pts_count) in events {
        match state.check_pts(new_pts, pts_count) {
            GateCheck::Ok => state.apply_pts(new_pts),
            GateCheck::Gap => {
                // The difference response is authoritative: it carries the
                // server-side state including everything we missed.
                difference_fetches += 1;
                state.apply_pts(new_pts);
            }
            GateCheck::Duplicate => {
                assert!(new_pts <= state.pts, "duplicates are never ahead");
            }
        }
        // Invariant: pts only ever moves forward.
        assert!(state.pts >= 100);
    }

    assert_eq!(difference_fetches, 1, "exactly the 103→105 jump needs a fetch");
    assert_eq!(state.pts, 107);
}

#[test]
fn qts_and_seq_follow_the_same_discipline() {
    let mut state = UpdateState::default();
    state.qts = 10;
    state.seq = 20;

    assert_eq!(state.check_qts(11), GateCheck::Ok);
    state.apply_qts(11);
    assert_eq!(state.check_qts(11), GateCheck::Duplicate);
    assert_eq!(state.check_qts(13), GateCheck::Gap);

    // seq == 0 envelopes are unsequenced and always acceptable.
    assert_eq!(state.check_seq(0), GateCheck::Ok);
    assert_eq!(state.check_seq(21), GateCheck::Ok);
    assert_eq!(state.check_seq(23), GateCheck::Gap);
    assert_eq!(state.check_seq(19), GateCheck::Duplicate);
}

#[test]
fn channels_are_gated_independently() {
    let mut state = UpdateState::default();
    state.apply_pts(500);
    state.apply_channel_pts(1, 10);
    state.apply_channel_pts(2, 99);

    // Advancing channel 1 does not disturb channel 2 or the global counter.
    assert_eq!(state.check_channel_pts(1, 11, 1), GateCheck::Ok);
    state.apply_channel_pts(1, 11);
    assert_eq!(state.check_channel_pts(2, 100, 1), GateCheck::Ok);
    assert_eq!(state.check_channel_pts(2, 150, 1), GateCheck::Gap);
    assert_eq!(state.pts, 500);
}
