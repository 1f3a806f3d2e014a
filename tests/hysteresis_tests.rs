use std::sync::Arc;
use std::time::Duration;

use empathlens::kernel::hysteresis::{propose, HysteresisStateMachine};
use empathlens::kernel::state::{DistressState, HISTORY_CAPACITY};
use empathlens::kernel::time::{Clock, ManualClock};
use empathlens::session::Session;

fn machine(window: usize) -> (Arc<ManualClock>, HysteresisStateMachine) {
    let clock = Arc::new(ManualClock::new());
    let machine = HysteresisStateMachine::new(clock.clone(), window, Duration::from_secs(120));
    (clock, machine)
}

fn session_in(clock: &ManualClock, state: DistressState) -> Session {
    let mut session = Session::new("chat-1", clock.now());
    session.current_state = state;
    session
}

#[test]
fn test_probability_bands() {
    use DistressState::*;

    assert_eq!(propose(0.6, Calm), Panic);
    assert_eq!(propose(0.95, Recovery), Panic);
    assert_eq!(propose(0.5, Calm), Overwhelmed);
    assert_eq!(propose(0.59, Rising), Overwhelmed);
    assert_eq!(propose(0.2, Calm), Rising);
    assert_eq!(propose(0.49, Panic), Rising);
    assert_eq!(propose(0.19, Calm), Calm);
}

#[test]
fn test_recovery_paths() {
    use DistressState::*;

    assert_eq!(propose(0.15, Panic), Recovery, "distressed and low goes to recovery");
    assert_eq!(propose(0.1, Rising), Recovery);
    assert_eq!(propose(0.05, Overwhelmed), Calm, "below the recovery band");
    assert_eq!(propose(0.15, Recovery), Calm, "recovery settles to calm below 0.25");
    assert_eq!(propose(0.15, Calm), Calm, "calm never enters recovery");
}

#[test]
fn test_crisis_flag_wins() {
    let (clock, machine) = machine(1);
    let session = session_in(&clock, DistressState::Calm);

    let t = machine.determine_state(&session, 1.0, true);
    assert_eq!(t.state, DistressState::CrisisRisk);
    assert!(t.changed, "entering crisis from calm is a change");

    // Crisis ignores the probability entirely.
    let t = machine.determine_state(&session, 0.0, true);
    assert_eq!(t.state, DistressState::CrisisRisk);

    let already = session_in(&clock, DistressState::CrisisRisk);
    let t = machine.determine_state(&already, 1.0, true);
    assert!(!t.changed);
}

#[test]
fn test_crisis_holds_on_quiet_messages() {
    let (clock, machine) = machine(1);
    let session = session_in(&clock, DistressState::CrisisRisk);

    let t = machine.determine_state(&session, 0.0, false);
    assert_eq!(t.state, DistressState::CrisisRisk);
    assert!(!t.changed);
    assert!(machine.history("chat-1").is_empty(), "held crisis does not push history");
}

#[test]
fn test_stopped_session_is_calm() {
    let (clock, machine) = machine(1);
    let mut session = session_in(&clock, DistressState::Panic);
    session.stopped.arm();

    for (prob, crisis) in [(0.9, false), (1.0, true), (0.0, false)] {
        let t = machine.determine_state(&session, prob, crisis);
        assert_eq!(t.state, DistressState::Calm);
        assert!(!t.changed, "stopped sessions never report a change");
    }
}

#[test]
fn test_single_window_confirms_immediately() {
    let (clock, machine) = machine(1);
    let session = session_in(&clock, DistressState::Calm);

    let t = machine.determine_state(&session, 0.85, false);
    assert_eq!(t.state, DistressState::Panic);
    assert!(t.changed);
}

#[test]
fn test_wider_window_needs_agreement() {
    let (clock, machine) = machine(3);
    let session = session_in(&clock, DistressState::Calm);

    let first = machine.determine_state(&session, 0.7, false);
    let second = machine.determine_state(&session, 0.7, false);
    assert_eq!(first.state, DistressState::Calm);
    assert_eq!(second.state, DistressState::Calm);

    let third = machine.determine_state(&session, 0.7, false);
    assert_eq!(third.state, DistressState::Panic, "three agreeing proposals confirm");
    assert!(third.changed);

    // A single outlier breaks the run.
    let outlier = machine.determine_state(&session, 0.3, false);
    assert_eq!(outlier.state, DistressState::Calm);
}

#[test]
fn test_history_is_bounded() {
    let (clock, machine) = machine(1);
    let session = session_in(&clock, DistressState::Calm);

    for _ in 0..(HISTORY_CAPACITY + 3) {
        machine.determine_state(&session, 0.3, false);
    }
    let history = machine.history("chat-1");
    assert_eq!(history.len(), HISTORY_CAPACITY);
    assert!(history.iter().all(|s| *s == DistressState::Rising));

    machine.forget("chat-1");
    assert!(machine.history("chat-1").is_empty());
}

#[test]
fn test_escalation_timing() {
    let (clock, machine) = machine(1);

    let crisis = session_in(&clock, DistressState::CrisisRisk);
    assert!(machine.should_escalate(&crisis), "crisis escalates at once");

    let panic = session_in(&clock, DistressState::Panic);
    let overwhelmed = session_in(&clock, DistressState::Overwhelmed);
    let rising = session_in(&clock, DistressState::Rising);
    assert!(!machine.should_escalate(&panic));

    clock.advance_secs(120);
    assert!(!machine.should_escalate(&panic), "timeout is exclusive");

    clock.advance_secs(1);
    assert!(machine.should_escalate(&panic));
    assert!(machine.should_escalate(&overwhelmed));
    assert!(!machine.should_escalate(&rising), "rising never escalates on time");
}
