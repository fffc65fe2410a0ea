//! Diagnostic event catalog and in-memory event ring.
//!
//! The repeater core reports progress through strongly typed events rather
//! than preformatted text. Events carry compact numeric codes for transport
//! over a debug channel and render as text via [`core::fmt::Display`] for
//! host tooling. Recording is best effort: the ring overwrites its oldest
//! entry once full and never blocks the caller.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::lifecycle::{RepeaterState, Tick};
use crate::standby::StorageError;

/// Identifier assigned to each recorded diagnostic event.
pub type EventId = u32;

/// Total number of diagnostic entries retained in memory by default.
pub const DIAGNOSTIC_RING_CAPACITY: usize = 64;

/// Discriminated diagnostic events reported by the repeater core.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DiagnosticEventKind {
    /// Persisted standby mode observed at initialization.
    ModeLoaded { standby: bool },
    /// Deep low-power mode entered.
    EnteringStandby,
    /// Deep low-power mode left in favor of the normal idle wait.
    ExitingStandby,
    /// Scheduled wake fired.
    ScheduledWake { from_standby: bool },
    /// Explicit wake request honored while in standby.
    ManualWake,
    /// Hardware settle window elapsed; identification follows.
    SetupComplete,
    /// Identification burst started.
    IdentStarted,
    /// Identification burst finished; receiver is listening.
    ListenStarted,
    /// Listen window elapsed; the next wake is scheduled.
    CycleComplete { next_wake_at: Tick },
    /// No forward progress within the watchdog window.
    WatchdogTimeout { state: RepeaterState },
    /// Valid tap command stored and forwarded.
    TapAccepted { taps: u8 },
    /// Out-of-range tap count cleared the stored command.
    TapCleared { taps: u8 },
    /// Standby storage access failed; state was left untouched.
    StorageFault(StorageError),
    /// Event decoded from an unknown transport code.
    Custom(u16),
}

impl fmt::Display for DiagnosticEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticEventKind::ModeLoaded { standby: true } => {
                f.write_str("permanent standby: enabled")
            }
            DiagnosticEventKind::ModeLoaded { standby: false } => {
                f.write_str("permanent standby: disabled")
            }
            DiagnosticEventKind::EnteringStandby => f.write_str("entering standby"),
            DiagnosticEventKind::ExitingStandby => f.write_str("exiting standby"),
            DiagnosticEventKind::ScheduledWake { from_standby: true } => {
                f.write_str("scheduled wake from standby")
            }
            DiagnosticEventKind::ScheduledWake {
                from_standby: false,
            } => f.write_str("scheduled wake"),
            DiagnosticEventKind::ManualWake => f.write_str("waking from standby"),
            DiagnosticEventKind::SetupComplete => f.write_str("setup complete"),
            DiagnosticEventKind::IdentStarted => f.write_str("transmitting identification"),
            DiagnosticEventKind::ListenStarted => f.write_str("listening"),
            DiagnosticEventKind::CycleComplete { next_wake_at } => {
                write!(f, "cycle complete, next wake at tick {next_wake_at}")
            }
            DiagnosticEventKind::WatchdogTimeout { state } => {
                write!(f, "watchdog timeout in {state}")
            }
            DiagnosticEventKind::TapAccepted { taps } => write!(f, "tap command: {taps}"),
            DiagnosticEventKind::TapCleared { taps } => {
                write!(f, "tap count {taps} out of range, command cleared")
            }
            DiagnosticEventKind::StorageFault(error) => write!(f, "storage fault: {error}"),
            DiagnosticEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl DiagnosticEventKind {
    const MODE_LOADED_BASE: u16 = 0x0000;
    const ENTERING_STANDBY_CODE: u16 = 0x0002;
    const EXITING_STANDBY_CODE: u16 = 0x0003;
    const SCHEDULED_WAKE_BASE: u16 = 0x0004;
    const MANUAL_WAKE_CODE: u16 = 0x0006;
    const SETUP_COMPLETE_CODE: u16 = 0x0007;
    const IDENT_STARTED_CODE: u16 = 0x0008;
    const LISTEN_STARTED_CODE: u16 = 0x0009;
    const CYCLE_COMPLETE_CODE: u16 = 0x000A;
    const WATCHDOG_BASE: u16 = 0x0010;
    const TAP_ACCEPTED_BASE: u16 = 0x0020;
    const TAP_CLEARED_BASE: u16 = 0x0030;
    const STORAGE_FAULT_BASE: u16 = 0x0040;

    /// Encodes the event into a compact transport-friendly discriminant.
    ///
    /// Payloads that do not fit the code space are reduced: the absolute
    /// next-wake tick is dropped, and cleared tap counts saturate at 15,
    /// so a decoded count of 15 means "15 or more". The code always
    /// identifies the event.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            DiagnosticEventKind::ModeLoaded { standby } => {
                Self::MODE_LOADED_BASE + standby as u16
            }
            DiagnosticEventKind::EnteringStandby => Self::ENTERING_STANDBY_CODE,
            DiagnosticEventKind::ExitingStandby => Self::EXITING_STANDBY_CODE,
            DiagnosticEventKind::ScheduledWake { from_standby } => {
                Self::SCHEDULED_WAKE_BASE + from_standby as u16
            }
            DiagnosticEventKind::ManualWake => Self::MANUAL_WAKE_CODE,
            DiagnosticEventKind::SetupComplete => Self::SETUP_COMPLETE_CODE,
            DiagnosticEventKind::IdentStarted => Self::IDENT_STARTED_CODE,
            DiagnosticEventKind::ListenStarted => Self::LISTEN_STARTED_CODE,
            DiagnosticEventKind::CycleComplete { .. } => Self::CYCLE_COMPLETE_CODE,
            DiagnosticEventKind::WatchdogTimeout { state } => {
                Self::WATCHDOG_BASE + state.as_index() as u16
            }
            DiagnosticEventKind::TapAccepted { taps } => {
                Self::TAP_ACCEPTED_BASE + taps as u16
            }
            DiagnosticEventKind::TapCleared { taps } => {
                let clamped = if taps > 0x0F { 0x0F } else { taps };
                Self::TAP_CLEARED_BASE + clamped as u16
            }
            DiagnosticEventKind::StorageFault(error) => {
                Self::STORAGE_FAULT_BASE + error.to_raw() as u16
            }
            DiagnosticEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`Custom`].
    ///
    /// [`Custom`]: DiagnosticEventKind::Custom
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::MODE_LOADED_BASE => DiagnosticEventKind::ModeLoaded { standby: false },
            0x0001 => DiagnosticEventKind::ModeLoaded { standby: true },
            Self::ENTERING_STANDBY_CODE => DiagnosticEventKind::EnteringStandby,
            Self::EXITING_STANDBY_CODE => DiagnosticEventKind::ExitingStandby,
            Self::SCHEDULED_WAKE_BASE => DiagnosticEventKind::ScheduledWake {
                from_standby: false,
            },
            0x0005 => DiagnosticEventKind::ScheduledWake { from_standby: true },
            Self::MANUAL_WAKE_CODE => DiagnosticEventKind::ManualWake,
            Self::SETUP_COMPLETE_CODE => DiagnosticEventKind::SetupComplete,
            Self::IDENT_STARTED_CODE => DiagnosticEventKind::IdentStarted,
            Self::LISTEN_STARTED_CODE => DiagnosticEventKind::ListenStarted,
            Self::CYCLE_COMPLETE_CODE => DiagnosticEventKind::CycleComplete { next_wake_at: 0 },
            value if (Self::WATCHDOG_BASE..Self::TAP_ACCEPTED_BASE).contains(&value) => {
                let offset = (value - Self::WATCHDOG_BASE) as usize;
                RepeaterState::from_index(offset).map_or(DiagnosticEventKind::Custom(value), |state| {
                    DiagnosticEventKind::WatchdogTimeout { state }
                })
            }
            value if (Self::TAP_ACCEPTED_BASE..Self::TAP_CLEARED_BASE).contains(&value) => {
                DiagnosticEventKind::TapAccepted {
                    taps: (value - Self::TAP_ACCEPTED_BASE) as u8,
                }
            }
            value if (Self::TAP_CLEARED_BASE..Self::STORAGE_FAULT_BASE).contains(&value) => {
                DiagnosticEventKind::TapCleared {
                    taps: (value - Self::TAP_CLEARED_BASE) as u8,
                }
            }
            value if (Self::STORAGE_FAULT_BASE..Self::STORAGE_FAULT_BASE + 2).contains(&value) => {
                StorageError::from_raw((value - Self::STORAGE_FAULT_BASE) as u8)
                    .map_or(DiagnosticEventKind::Custom(value), DiagnosticEventKind::StorageFault)
            }
            other => DiagnosticEventKind::Custom(other),
        }
    }
}

/// Diagnostic record stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DiagnosticRecord {
    pub id: EventId,
    pub tick: Tick,
    pub kind: DiagnosticEventKind,
}

/// Records diagnostic events into a fixed-size ring buffer.
pub struct DiagnosticsRecorder<const CAPACITY: usize = DIAGNOSTIC_RING_CAPACITY> {
    ring: HistoryBuf<DiagnosticRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> DiagnosticsRecorder<CAPACITY> {
    /// Creates a recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Records a diagnostic event, returning its identifier.
    pub fn record(&mut self, kind: DiagnosticEventKind, tick: Tick) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(DiagnosticRecord { id, tick, kind });
        id
    }

    /// Returns an iterator over the retained records in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, DiagnosticRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent record, if any.
    pub fn latest(&self) -> Option<&DiagnosticRecord> {
        self.ring.recent()
    }

    /// Returns the number of retained records.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no records are retained.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Identifier the next recorded event will receive.
    ///
    /// Host tooling uses this as a cursor to print only events recorded
    /// since the previous command.
    #[must_use]
    pub const fn next_event_id(&self) -> EventId {
        self.next_event_id
    }
}

impl<const CAPACITY: usize> Default for DiagnosticsRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_assigns_sequential_ids() {
        let mut recorder = DiagnosticsRecorder::<8>::new();
        let first = recorder.record(DiagnosticEventKind::EnteringStandby, 0);
        let second = recorder.record(DiagnosticEventKind::ExitingStandby, 5);
        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(recorder.len(), 2);
        assert_eq!(
            recorder.latest().map(|record| record.kind),
            Some(DiagnosticEventKind::ExitingStandby)
        );
    }

    #[test]
    fn ring_overwrites_oldest_when_full() {
        let mut recorder = DiagnosticsRecorder::<4>::new();
        for taps in 0..6u8 {
            recorder.record(DiagnosticEventKind::TapCleared { taps }, Tick::from(taps));
        }
        assert_eq!(recorder.len(), 4);
        let oldest = recorder.oldest_first().next().expect("ring is non-empty");
        assert_eq!(oldest.kind, DiagnosticEventKind::TapCleared { taps: 2 });
    }

    #[test]
    fn raw_codes_round_trip() {
        let events = [
            DiagnosticEventKind::ModeLoaded { standby: true },
            DiagnosticEventKind::ModeLoaded { standby: false },
            DiagnosticEventKind::EnteringStandby,
            DiagnosticEventKind::ExitingStandby,
            DiagnosticEventKind::ScheduledWake { from_standby: true },
            DiagnosticEventKind::ScheduledWake {
                from_standby: false,
            },
            DiagnosticEventKind::ManualWake,
            DiagnosticEventKind::SetupComplete,
            DiagnosticEventKind::IdentStarted,
            DiagnosticEventKind::ListenStarted,
            DiagnosticEventKind::WatchdogTimeout {
                state: RepeaterState::Wake,
            },
            DiagnosticEventKind::TapAccepted { taps: 4 },
            DiagnosticEventKind::TapCleared { taps: 6 },
            DiagnosticEventKind::StorageFault(StorageError::Write),
        ];
        for event in events {
            assert_eq!(DiagnosticEventKind::from_raw(event.to_raw()), event);
        }
    }

    #[test]
    fn cleared_tap_counts_saturate_in_the_compact_code() {
        let large = DiagnosticEventKind::TapCleared { taps: 250 };
        assert_eq!(
            large.to_raw(),
            DiagnosticEventKind::TapCleared { taps: 15 }.to_raw()
        );
        assert_eq!(
            DiagnosticEventKind::from_raw(large.to_raw()),
            DiagnosticEventKind::TapCleared { taps: 15 }
        );
        // In-range counts still round trip exactly.
        let small = DiagnosticEventKind::TapCleared { taps: 9 };
        assert_eq!(DiagnosticEventKind::from_raw(small.to_raw()), small);
    }

    #[test]
    fn cycle_complete_encoding_drops_the_tick_payload() {
        let event = DiagnosticEventKind::CycleComplete {
            next_wake_at: 1_440_000,
        };
        assert_eq!(
            DiagnosticEventKind::from_raw(event.to_raw()),
            DiagnosticEventKind::CycleComplete { next_wake_at: 0 }
        );
    }

    #[test]
    fn unknown_codes_decode_as_custom() {
        assert_eq!(
            DiagnosticEventKind::from_raw(0x0F00),
            DiagnosticEventKind::Custom(0x0F00)
        );
    }
}
