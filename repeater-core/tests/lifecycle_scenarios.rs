//! End-to-end lifecycle scenarios driven through the public API.

use repeater_core::diagnostics::DiagnosticEventKind;
use repeater_core::lifecycle::{
    LifecycleConfig, LinkActivity, PollOutcome, RepeaterController, RepeaterState, Tick,
};
use repeater_core::platform::{
    DisplayControl, IdentStatus, IdentTransmitter, MemoryStore, PowerControl, RadioControl,
};
use repeater_core::standby::DEFAULT_STANDBY_ADDRESS;

#[derive(Default)]
struct ProbeRadio {
    idle_calls: usize,
    activate_calls: usize,
}

impl RadioControl for ProbeRadio {
    fn idle(&mut self) {
        self.idle_calls += 1;
    }

    fn activate(&mut self) {
        self.activate_calls += 1;
    }

    fn set_receiver_idle(&mut self, _: bool) {}
}

#[derive(Default)]
struct ProbeDisplay {
    sleep_calls: usize,
}

impl DisplayControl for ProbeDisplay {
    fn sleep(&mut self) {
        self.sleep_calls += 1;
    }
}

#[derive(Default)]
struct ProbePower {
    low_power_calls: usize,
}

impl PowerControl for ProbePower {
    fn enter_low_power(&mut self) {
        self.low_power_calls += 1;
    }
}

#[derive(Default)]
struct ProbeIdent {
    begun: usize,
}

impl IdentTransmitter for ProbeIdent {
    fn begin(&mut self) {
        self.begun += 1;
    }

    fn status(&mut self) -> IdentStatus {
        IdentStatus::Complete
    }
}

type ProbeController =
    RepeaterController<ProbeRadio, ProbeDisplay, ProbePower, ProbeIdent, MemoryStore>;

// Windows shrunk so a whole cycle stays cheap to step through.
const CONFIG: LifecycleConfig =
    LifecycleConfig::new(500, 100, 5_000, 20_000, DEFAULT_STANDBY_ADDRESS);

fn boot(byte: u8) -> ProbeController {
    RepeaterController::new(
        CONFIG,
        ProbeRadio::default(),
        ProbeDisplay::default(),
        ProbePower::default(),
        ProbeIdent::default(),
        MemoryStore::new(byte),
        0,
    )
}

/// Steady driving loop: one poll every 100 ticks up to `target`.
fn drive(controller: &mut ProbeController, now: &mut Tick, target: Tick) -> PollOutcome {
    let mut last = PollOutcome::Unchanged;
    while *now < target {
        *now = (*now + 100).min(target);
        last = controller.poll(*now, LinkActivity::Quiet);
    }
    last
}

fn recorded_kinds(controller: &ProbeController) -> Vec<DiagnosticEventKind> {
    controller
        .diagnostics()
        .oldest_first()
        .map(|record| record.kind)
        .collect()
}

#[test]
fn persisted_flag_boots_straight_into_standby() {
    let controller = boot(0x01);

    assert_eq!(controller.state(), RepeaterState::Standby);
    assert!(controller.permanent_standby());
    assert_eq!(controller.radio().idle_calls, 1);
    assert_eq!(controller.display().sleep_calls, 1);
    assert_eq!(controller.power().low_power_calls, 1);
    assert_eq!(
        recorded_kinds(&controller),
        [DiagnosticEventKind::ModeLoaded { standby: true }]
    );
}

#[test]
fn clear_flag_waits_idle_until_the_interval_elapses() {
    let mut controller = boot(0x00);
    let wake_at = controller.next_wake_at();
    assert_eq!(wake_at, CONFIG.wake_interval);

    let mut now = 0;
    drive(&mut controller, &mut now, wake_at - 1);
    assert_eq!(controller.state(), RepeaterState::Idle);

    assert_eq!(
        controller.poll(wake_at, LinkActivity::Quiet),
        PollOutcome::Advanced {
            from: RepeaterState::Idle,
            to: RepeaterState::Wake,
        }
    );
}

#[test]
fn scheduled_cycle_emits_events_in_strict_order() {
    let mut controller = boot(0x00);
    let wake_at = controller.next_wake_at();
    let mut now = 0;

    let last = drive(
        &mut controller,
        &mut now,
        wake_at + CONFIG.setup_window + CONFIG.listen_window + 200,
    );
    assert_eq!(controller.state(), RepeaterState::Idle);
    assert!(matches!(
        last,
        PollOutcome::Unchanged | PollOutcome::Advanced { .. }
    ));

    let kinds = recorded_kinds(&controller);
    let sequence: Vec<_> = kinds
        .iter()
        .map(|kind| match kind {
            DiagnosticEventKind::ModeLoaded { .. } => "loaded",
            DiagnosticEventKind::ScheduledWake { .. } => "wake",
            DiagnosticEventKind::SetupComplete => "setup",
            DiagnosticEventKind::IdentStarted => "ident",
            DiagnosticEventKind::ListenStarted => "listen",
            DiagnosticEventKind::CycleComplete { .. } => "complete",
            other => panic!("unexpected event in a clean cycle: {other:?}"),
        })
        .collect();
    assert_eq!(
        sequence,
        ["loaded", "wake", "setup", "ident", "listen", "complete"]
    );
    assert_eq!(controller.ident().begun, 1);
}

#[test]
fn stalled_loop_in_wake_recovers_without_reaching_ident() {
    let mut controller = boot(0x00);
    let wake_at = controller.next_wake_at();
    let mut now = 0;
    drive(&mut controller, &mut now, wake_at);
    assert_eq!(controller.state(), RepeaterState::Wake);

    // The loop goes quiet past the watchdog window; the next poll must
    // recover instead of advancing into the identification burst.
    let stalled_at = wake_at + CONFIG.watchdog_window + 1;
    assert_eq!(
        controller.poll(stalled_at, LinkActivity::Quiet),
        PollOutcome::WatchdogRecovery {
            resumed: RepeaterState::Idle,
        }
    );
    assert_eq!(controller.ident().begun, 0);
    assert!(recorded_kinds(&controller).contains(&DiagnosticEventKind::WatchdogTimeout {
        state: RepeaterState::Wake,
    }));
}

#[test]
fn each_completed_cycle_advances_the_schedule_by_one_interval() {
    let mut controller = boot(0x00);
    let first_wake = controller.next_wake_at();
    let mut now = 0;

    drive(
        &mut controller,
        &mut now,
        first_wake + CONFIG.setup_window + CONFIG.listen_window + 200,
    );
    assert_eq!(controller.state(), RepeaterState::Idle);
    let second_wake = controller.next_wake_at();

    // Completion happens on the first poll at or past the listen window,
    // so the new schedule is anchored on that poll's tick.
    let cycle_len = second_wake - first_wake;
    assert!(cycle_len >= CONFIG.setup_window + CONFIG.listen_window + CONFIG.wake_interval);
    assert!(cycle_len < CONFIG.setup_window + CONFIG.listen_window + CONFIG.wake_interval + 400);

    drive(
        &mut controller,
        &mut now,
        second_wake + CONFIG.setup_window + CONFIG.listen_window + 200,
    );
    assert_eq!(controller.state(), RepeaterState::Idle);
    assert!(controller.next_wake_at() > second_wake + CONFIG.wake_interval);
}

#[test]
fn standby_toggle_survives_a_reboot_through_the_same_store() {
    let mut controller = boot(0x00);
    controller
        .set_permanent_standby(true, 10)
        .expect("write succeeds");
    assert_eq!(controller.state(), RepeaterState::Standby);

    // A fresh controller over the same byte observes the persisted mode.
    let byte = controller.store().byte();
    let rebooted = boot(byte);
    assert_eq!(rebooted.state(), RepeaterState::Standby);
    assert!(rebooted.permanent_standby());
}

#[test]
fn explicit_wake_runs_a_cycle_back_into_standby() {
    let mut controller = boot(0x01);
    assert!(controller.request_wake(50));
    assert_eq!(controller.state(), RepeaterState::Wake);

    let mut now = 50;
    let last = drive(
        &mut controller,
        &mut now,
        50 + CONFIG.setup_window + CONFIG.listen_window + 200,
    );
    assert_eq!(controller.state(), RepeaterState::Standby);
    assert!(matches!(
        last,
        PollOutcome::Unchanged
            | PollOutcome::Advanced {
                to: RepeaterState::Standby,
                ..
            }
    ));
    assert!(recorded_kinds(&controller).contains(&DiagnosticEventKind::ManualWake));
}
