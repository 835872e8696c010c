//! End-to-end session runs against the built-in catalog.

use respira_breath::{
    catalog, BreathError, BreathingPattern, Phase, PhaseDurations, PhaseObserver,
    SessionController, SessionState, TimingMode,
};

#[derive(Debug, Default)]
struct Recorder {
    entries: Vec<Phase>,
}

impl PhaseObserver for Recorder {
    fn on_phase_changed(&mut self, phase: Phase) {
        self.entries.push(phase);
    }
}

fn pattern(inhale: f64, hold: f64, exhale: f64, after: f64, cycles: u32) -> BreathingPattern {
    BreathingPattern::new("p", "P", PhaseDurations::new(inhale, hold, exhale, after), cycles)
}

/// Tick in whole-phase steps until the session stops running.
fn run_to_end<O: PhaseObserver>(c: &mut SessionController<O>) -> usize {
    let mut transitions = 0;
    while c.is_running() {
        let step = c.time_remaining();
        if c.tick(step).is_some() {
            transitions += 1;
        }
        assert!(transitions < 10_000, "session never completed");
    }
    transitions
}

#[test]
fn relaxation_pattern_walks_first_cycle() {
    let mut c = SessionController::new(Recorder::default());
    c.start(catalog::lookup("4-7-8").unwrap()).unwrap();
    assert_eq!((c.phase(), c.time_remaining()), (Phase::Inhale, 4.0));

    assert_eq!(c.tick(4.0), Some(Phase::Hold));
    assert_eq!(c.time_remaining(), 7.0);
    assert_eq!(c.tick(7.0), Some(Phase::Exhale));
    assert_eq!(c.time_remaining(), 8.0);
    assert_eq!(c.tick(8.0), Some(Phase::Inhale));
    assert_eq!(c.time_remaining(), 4.0);
    assert_eq!(c.cycle_index(), 1);

    assert_eq!(
        c.observer().entries,
        vec![Phase::Inhale, Phase::Hold, Phase::Exhale, Phase::Inhale]
    );
}

#[test]
fn box_breathing_completes_after_24_transitions() {
    let mut c = SessionController::new(Recorder::default());
    c.start(catalog::lookup("4-4-4").unwrap()).unwrap();
    assert_eq!(run_to_end(&mut c), 24);
    assert_eq!(c.phase(), Phase::Complete);
    assert!(!c.is_running());
    assert_eq!(c.observer().entries.last(), Some(&Phase::Complete));
    // start entry + 24 transitions
    assert_eq!(c.observer().entries.len(), 25);
}

#[test]
fn zero_cycle_start_fails_and_keeps_existing_state() {
    let mut c = SessionController::default();
    c.start(catalog::lookup("6-2-6").unwrap()).unwrap();
    c.tick(6.0);
    c.tick(0.5);
    let before = c.state();

    let err = c.start(&pattern(4.0, 0.0, 4.0, 0.0, 0)).unwrap_err();
    assert!(matches!(err, BreathError::InvalidPattern(_)));
    assert_eq!(c.state(), before);
}

#[test]
fn holdless_cycles_visit_inhale_and_exhale_only() {
    for (inhale, exhale, cycles) in [(4.0, 6.0, 8), (1.0, 1.0, 1), (2.5, 3.5, 3)] {
        let mut c = SessionController::new(Recorder::default());
        c.start(&pattern(inhale, 0.0, exhale, 0.0, cycles)).unwrap();
        run_to_end(&mut c);

        let entries = &c.observer().entries;
        let cycle_phases: Vec<_> = entries[..entries.len() - 1].to_vec();
        assert_eq!(cycle_phases.len(), 2 * cycles as usize);
        for pair in cycle_phases.chunks(2) {
            assert_eq!(pair, [Phase::Inhale, Phase::Exhale]);
        }
    }
}

#[test]
fn double_hold_cycles_visit_all_four_in_order() {
    let mut c = SessionController::new(Recorder::default());
    c.start(&pattern(3.0, 1.0, 3.0, 2.0, 3)).unwrap();
    run_to_end(&mut c);

    let entries = &c.observer().entries;
    for cycle in entries[..entries.len() - 1].chunks(4) {
        assert_eq!(
            cycle,
            [Phase::Inhale, Phase::Hold, Phase::Exhale, Phase::HoldAfterExhale]
        );
    }
}

#[test]
fn every_builtin_completes_after_its_cycle_count() {
    for p in &catalog::BUILTIN {
        let mut c = SessionController::new(Recorder::default());
        c.start(p).unwrap();
        run_to_end(&mut c);
        assert_eq!(c.phase(), Phase::Complete, "{}", p.key);
        assert!(!c.is_running());
        let inhales = c.observer().entries.iter().filter(|&&e| e == Phase::Inhale).count();
        assert_eq!(inhales, p.cycle_count as usize, "{}", p.key);
    }
}

#[test]
fn hundred_ms_ticks_match_wall_clock_session_length() {
    let p = catalog::lookup("4-6").unwrap();
    let mut c = SessionController::default();
    c.start(p).unwrap();

    let mut ticks = 0u32;
    while c.is_running() {
        c.tick(0.1);
        ticks += 1;
        assert!(ticks < 10_000);
    }
    // 8 cycles of 10 s
    assert_eq!(ticks, 800);
}

#[test]
fn carry_over_keeps_coarse_ticks_in_step_with_the_clock() {
    let p = catalog::lookup("4-7-8").unwrap();
    let mut c = SessionController::default().with_timing(TimingMode::CarryOver);
    c.start(p).unwrap();

    // 3 s ticks: 4 s inhale ends at t=6 with 2 s already spent in hold
    c.tick(3.0);
    assert_eq!(c.tick(3.0), Some(Phase::Hold));
    assert_eq!(c.time_remaining(), 5.0);
}

#[test]
fn reset_from_every_phase_returns_to_ready() {
    let p = catalog::lookup("4-4-4").unwrap();
    for steps in 0..=5 {
        let mut c = SessionController::default();
        c.start(p).unwrap();
        for _ in 0..steps {
            c.tick(4.0);
        }
        c.reset();
        assert_eq!(c.state(), SessionState::READY);
    }

    let mut done = SessionController::default();
    done.start(&pattern(1.0, 0.0, 1.0, 0.0, 1)).unwrap();
    run_to_end(&mut done);
    assert_eq!(done.phase(), Phase::Complete);
    done.reset();
    assert_eq!(done.state(), SessionState::READY);
}

#[test]
fn pausing_twice_equals_pausing_once() {
    let p = catalog::lookup("4-7-8").unwrap();
    let mut once = SessionController::default();
    let mut twice = SessionController::default();
    for c in [&mut once, &mut twice] {
        c.start(p).unwrap();
        c.tick(2.0);
    }
    once.pause();
    twice.pause();
    twice.pause();
    assert_eq!(once.state(), twice.state());
}

#[test]
fn ticks_do_nothing_while_not_running() {
    let mut c = SessionController::new(Recorder::default());
    assert_eq!(c.tick(1.0), None);
    assert_eq!(c.state(), SessionState::READY);

    c.start(catalog::lookup("4-6").unwrap()).unwrap();
    c.pause();
    let frozen = c.state();
    for _ in 0..100 {
        c.tick(0.1);
    }
    assert_eq!(c.state(), frozen);
    assert_eq!(c.observer().entries, vec![Phase::Inhale]);
}
