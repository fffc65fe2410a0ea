//! Repeater lifecycle state machine.
//!
//! One owned controller object tracks the duty-cycle of the unit: long
//! low-power waits punctuated by scheduled wakes, an identification burst,
//! and a listen window, with a watchdog forcing recovery when processing
//! stalls. The controller is driven cooperatively by a periodic
//! [`poll`](RepeaterController::poll) from the surrounding application and
//! calls out to the board through the capability traits in
//! [`crate::platform`].
//!
//! Every completed pass counts as forward progress for the watchdog, so
//! recovery fires only when the driving loop itself stops calling in for
//! longer than the watchdog window. The check deliberately does not run
//! while in [`RepeaterState::Standby`]: the unit is dormant there and the
//! only exits are the scheduled wake and an explicit wake request.

use core::fmt;

use crate::diagnostics::{DiagnosticEventKind, DiagnosticsRecorder};
use crate::platform::{
    DisplayControl, IdentStatus, IdentTransmitter, PowerControl, RadioControl, StandbyStore,
};
use crate::standby::{DEFAULT_STANDBY_ADDRESS, StorageError, decode_standby, encode_standby};

/// Absolute monotonic tick. One tick is [`TICK_PERIOD_MS`] milliseconds.
pub type Tick = u64;

/// Tick granularity of the collaborator clock, in milliseconds.
pub const TICK_PERIOD_MS: u64 = 10;

/// Converts a millisecond span into whole ticks, rounding down.
#[must_use]
pub const fn ticks_from_millis(millis: u64) -> Tick {
    millis / TICK_PERIOD_MS
}

/// Watchdog window: longest tolerated gap between polls (5 s).
pub const WATCHDOG_WINDOW_TICKS: Tick = ticks_from_millis(5_000);

/// Hardware settle time after waking before identification starts (1 s).
pub const SETUP_WINDOW_TICKS: Tick = ticks_from_millis(1_000);

/// Receive window after identification (50 s).
pub const LISTEN_WINDOW_TICKS: Tick = ticks_from_millis(50_000);

/// Interval between scheduled wakes (4 h).
pub const WAKE_INTERVAL_TICKS: Tick = ticks_from_millis(4 * 60 * 60 * 1_000);

/// Fixed design parameters of the lifecycle, expressed in ticks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LifecycleConfig {
    /// Maximum ticks without a completed poll before forced recovery.
    pub watchdog_window: Tick,
    /// Dwell in [`RepeaterState::Wake`] before identification.
    pub setup_window: Tick,
    /// Dwell in [`RepeaterState::Listen`] before the cycle completes.
    pub listen_window: Tick,
    /// Ticks between scheduled wakes.
    pub wake_interval: Tick,
    /// Storage address of the persisted standby byte.
    pub standby_address: u16,
}

impl LifecycleConfig {
    /// Creates a configuration with explicit windows.
    #[must_use]
    pub const fn new(
        watchdog_window: Tick,
        setup_window: Tick,
        listen_window: Tick,
        wake_interval: Tick,
        standby_address: u16,
    ) -> Self {
        Self {
            watchdog_window,
            setup_window,
            listen_window,
            wake_interval,
            standby_address,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::new(
            WATCHDOG_WINDOW_TICKS,
            SETUP_WINDOW_TICKS,
            LISTEN_WINDOW_TICKS,
            WAKE_INTERVAL_TICKS,
            DEFAULT_STANDBY_ADDRESS,
        )
    }
}

/// Lifecycle phases of the repeater. Exactly one is active at a time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RepeaterState {
    /// Normal low-power wait for the next scheduled wake.
    Idle,
    /// Deep low-power mode; persists across resets when the permanent
    /// standby flag is set.
    Standby,
    /// Hardware settling after a wake.
    Wake,
    /// Identification burst in progress.
    Morse,
    /// Receiver active, waiting for channel activity.
    Listen,
    /// Engaged repeater session. No exit is defined; the session only
    /// keeps the watchdog alive.
    Active,
}

impl RepeaterState {
    /// Deterministic index used by compact diagnostic codes.
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            RepeaterState::Idle => 0,
            RepeaterState::Standby => 1,
            RepeaterState::Wake => 2,
            RepeaterState::Morse => 3,
            RepeaterState::Listen => 4,
            RepeaterState::Active => 5,
        }
    }

    /// Attempts to construct a state from a raw index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(RepeaterState::Idle),
            1 => Some(RepeaterState::Standby),
            2 => Some(RepeaterState::Wake),
            3 => Some(RepeaterState::Morse),
            4 => Some(RepeaterState::Listen),
            5 => Some(RepeaterState::Active),
            _ => None,
        }
    }

    /// Returns `true` for the mid-cycle states between wake and idle.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            RepeaterState::Wake | RepeaterState::Morse | RepeaterState::Listen
        )
    }

    /// Returns `true` for the low-power waiting states.
    #[must_use]
    pub const fn is_dormant(self) -> bool {
        matches!(self, RepeaterState::Idle | RepeaterState::Standby)
    }
}

impl fmt::Display for RepeaterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepeaterState::Idle => "idle",
            RepeaterState::Standby => "standby",
            RepeaterState::Wake => "wake",
            RepeaterState::Morse => "morse",
            RepeaterState::Listen => "listen",
            RepeaterState::Active => "active",
        };
        f.write_str(name)
    }
}

/// Snapshot of the application's live transmit/receive session query.
///
/// The repeater lifecycle never interferes with a user session, so the
/// driving loop samples this before every poll.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkActivity {
    /// No user-initiated session in progress.
    Quiet,
    /// Radio is engaged in a live transmit or receive session.
    Engaged,
}

/// Observable result of one processing pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    /// Processing was postponed because a live session is in progress.
    Deferred,
    /// The watchdog fired and forced the machine back to a dormant state.
    WatchdogRecovery { resumed: RepeaterState },
    /// A normal transition occurred.
    Advanced {
        from: RepeaterState,
        to: RepeaterState,
    },
    /// Nothing changed this pass.
    Unchanged,
}

/// Owned lifecycle controller. Single-threaded and cooperative; every entry
/// point must be invoked from the same context as [`poll`](Self::poll).
pub struct RepeaterController<R, D, P, I, S> {
    config: LifecycleConfig,
    radio: R,
    display: D,
    power: P,
    ident: I,
    store: S,
    state: RepeaterState,
    permanent_standby: bool,
    next_wake_at: Tick,
    state_entered_at: Tick,
    watchdog_fed_at: Tick,
    diagnostics: DiagnosticsRecorder,
}

impl<R, D, P, I, S> RepeaterController<R, D, P, I, S>
where
    R: RadioControl,
    D: DisplayControl,
    P: PowerControl,
    I: IdentTransmitter,
    S: StandbyStore,
{
    /// Initializes the controller from the persisted standby flag.
    ///
    /// A set flag boots straight into [`RepeaterState::Standby`] with the
    /// standby side effects issued once; otherwise the controller starts in
    /// [`RepeaterState::Idle`]. The first scheduled wake lands one
    /// [`LifecycleConfig::wake_interval`] after `now`. A failed read is
    /// recorded and treated as a clear flag, since no previously confirmed
    /// value exists yet.
    pub fn new(
        config: LifecycleConfig,
        radio: R,
        display: D,
        power: P,
        ident: I,
        store: S,
        now: Tick,
    ) -> Self {
        let mut controller = Self {
            config,
            radio,
            display,
            power,
            ident,
            store,
            state: RepeaterState::Idle,
            permanent_standby: false,
            next_wake_at: now.saturating_add(config.wake_interval),
            state_entered_at: now,
            watchdog_fed_at: now,
            diagnostics: DiagnosticsRecorder::new(),
        };

        match controller.store.load(config.standby_address) {
            Ok(byte) => controller.permanent_standby = decode_standby(byte),
            Err(error) => {
                controller
                    .diagnostics
                    .record(DiagnosticEventKind::StorageFault(error), now);
            }
        }

        controller.diagnostics.record(
            DiagnosticEventKind::ModeLoaded {
                standby: controller.permanent_standby,
            },
            now,
        );

        if controller.permanent_standby {
            controller.state = RepeaterState::Standby;
            controller.standby_side_effects();
        }

        controller
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RepeaterState {
        self.state
    }

    /// In-memory permanent-standby flag.
    #[must_use]
    pub const fn permanent_standby(&self) -> bool {
        self.permanent_standby
    }

    /// Absolute tick of the next scheduled wake.
    #[must_use]
    pub const fn next_wake_at(&self) -> Tick {
        self.next_wake_at
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Read access to the diagnostics ring.
    #[must_use]
    pub const fn diagnostics(&self) -> &DiagnosticsRecorder {
        &self.diagnostics
    }

    /// Mutable access to the diagnostics ring, for components that share
    /// the controller's event stream.
    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticsRecorder {
        &mut self.diagnostics
    }

    /// Read access to the radio capability.
    pub const fn radio(&self) -> &R {
        &self.radio
    }

    /// Read access to the display capability.
    pub const fn display(&self) -> &D {
        &self.display
    }

    /// Read access to the power capability.
    pub const fn power(&self) -> &P {
        &self.power
    }

    /// Read access to the identification transmitter.
    pub const fn ident(&self) -> &I {
        &self.ident
    }

    /// Read access to the standby store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Periodic processing entry point.
    ///
    /// Order of business: the live-session guard (a strict no-op while the
    /// radio is engaged), then the watchdog check, which takes priority
    /// over and short-circuits the transition table when it fires.
    pub fn poll(&mut self, now: Tick, link: LinkActivity) -> PollOutcome {
        if link == LinkActivity::Engaged {
            return PollOutcome::Deferred;
        }

        if self.state != RepeaterState::Standby
            && now.saturating_sub(self.watchdog_fed_at) > self.config.watchdog_window
        {
            return self.recover_from_stall(now);
        }

        let outcome = self.step(now);
        // A completed pass is forward progress regardless of outcome.
        self.watchdog_fed_at = now;
        outcome
    }

    /// Explicit wake request.
    ///
    /// Only acts while in [`RepeaterState::Standby`], independent of the
    /// scheduled wake time; returns `true` when the wake was honored.
    pub fn request_wake(&mut self, now: Tick) -> bool {
        if self.state != RepeaterState::Standby {
            return false;
        }
        self.begin_wake(now, DiagnosticEventKind::ManualWake);
        true
    }

    /// Sets the permanent-standby flag, persisting it first.
    ///
    /// The byte is written even when the value does not change; the state
    /// machine only moves when the flag actually flips it into or out of
    /// standby. A failed write leaves both the in-memory flag and the state
    /// untouched so the persisted and in-memory values never diverge.
    pub fn set_permanent_standby(&mut self, enable: bool, now: Tick) -> Result<(), StorageError> {
        let byte = encode_standby(enable);
        if let Err(error) = self.store.persist(self.config.standby_address, byte) {
            self.diagnostics
                .record(DiagnosticEventKind::StorageFault(error), now);
            return Err(error);
        }

        self.permanent_standby = enable;
        if enable && self.state != RepeaterState::Standby {
            self.enter_standby(now);
        } else if !enable && self.state == RepeaterState::Standby {
            self.transition(RepeaterState::Idle, now);
            self.diagnostics
                .record(DiagnosticEventKind::ExitingStandby, now);
            self.radio.activate();
        }
        Ok(())
    }

    /// Transition table, evaluated once the guard and watchdog have passed.
    fn step(&mut self, now: Tick) -> PollOutcome {
        match self.state {
            RepeaterState::Idle => {
                if self.permanent_standby {
                    self.enter_standby(now);
                    PollOutcome::Advanced {
                        from: RepeaterState::Idle,
                        to: RepeaterState::Standby,
                    }
                } else if now >= self.next_wake_at {
                    self.begin_wake(
                        now,
                        DiagnosticEventKind::ScheduledWake {
                            from_standby: false,
                        },
                    );
                    PollOutcome::Advanced {
                        from: RepeaterState::Idle,
                        to: RepeaterState::Wake,
                    }
                } else {
                    PollOutcome::Unchanged
                }
            }
            RepeaterState::Standby => {
                if now >= self.next_wake_at {
                    self.begin_wake(now, DiagnosticEventKind::ScheduledWake { from_standby: true });
                    PollOutcome::Advanced {
                        from: RepeaterState::Standby,
                        to: RepeaterState::Wake,
                    }
                } else {
                    PollOutcome::Unchanged
                }
            }
            RepeaterState::Wake => {
                if now.saturating_sub(self.state_entered_at) >= self.config.setup_window {
                    self.transition(RepeaterState::Morse, now);
                    self.diagnostics
                        .record(DiagnosticEventKind::SetupComplete, now);
                    self.ident.begin();
                    self.diagnostics
                        .record(DiagnosticEventKind::IdentStarted, now);
                    PollOutcome::Advanced {
                        from: RepeaterState::Wake,
                        to: RepeaterState::Morse,
                    }
                } else {
                    PollOutcome::Unchanged
                }
            }
            RepeaterState::Morse => match self.ident.status() {
                IdentStatus::InProgress => PollOutcome::Unchanged,
                IdentStatus::Complete => {
                    self.transition(RepeaterState::Listen, now);
                    self.radio.activate();
                    self.diagnostics
                        .record(DiagnosticEventKind::ListenStarted, now);
                    PollOutcome::Advanced {
                        from: RepeaterState::Morse,
                        to: RepeaterState::Listen,
                    }
                }
            },
            RepeaterState::Listen => {
                if now.saturating_sub(self.state_entered_at) >= self.config.listen_window {
                    self.complete_cycle(now)
                } else {
                    PollOutcome::Unchanged
                }
            }
            // No exit is defined for an engaged session.
            RepeaterState::Active => PollOutcome::Unchanged,
        }
    }

    fn recover_from_stall(&mut self, now: Tick) -> PollOutcome {
        self.diagnostics.record(
            DiagnosticEventKind::WatchdogTimeout { state: self.state },
            now,
        );
        let resumed = if self.permanent_standby {
            self.enter_standby(now);
            RepeaterState::Standby
        } else {
            self.transition(RepeaterState::Idle, now);
            RepeaterState::Idle
        };
        PollOutcome::WatchdogRecovery { resumed }
    }

    fn complete_cycle(&mut self, now: Tick) -> PollOutcome {
        self.next_wake_at = now.saturating_add(self.config.wake_interval);
        self.diagnostics.record(
            DiagnosticEventKind::CycleComplete {
                next_wake_at: self.next_wake_at,
            },
            now,
        );
        let to = if self.permanent_standby {
            self.enter_standby(now);
            RepeaterState::Standby
        } else {
            self.transition(RepeaterState::Idle, now);
            RepeaterState::Idle
        };
        PollOutcome::Advanced {
            from: RepeaterState::Listen,
            to,
        }
    }

    fn begin_wake(&mut self, now: Tick, event: DiagnosticEventKind) {
        self.transition(RepeaterState::Wake, now);
        self.diagnostics.record(event, now);
        self.radio.activate();
        self.radio.set_receiver_idle(false);
    }

    fn enter_standby(&mut self, now: Tick) {
        self.transition(RepeaterState::Standby, now);
        self.diagnostics
            .record(DiagnosticEventKind::EnteringStandby, now);
        self.standby_side_effects();
    }

    fn standby_side_effects(&mut self) {
        self.radio.idle();
        self.display.sleep();
        self.power.enter_low_power();
    }

    /// Moves to `next` and refreshes both the dwell and watchdog timers.
    fn transition(&mut self, next: RepeaterState, now: Tick) {
        self.state = next;
        self.state_entered_at = now;
        self.watchdog_fed_at = now;
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: RepeaterState, now: Tick) {
        self.transition(state, now);
    }

    #[cfg(test)]
    pub(crate) fn starve_watchdog(&mut self, fed_at: Tick) {
        self.watchdog_fed_at = fed_at;
    }
}
