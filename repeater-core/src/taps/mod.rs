//! Tap-count command dispatch.
//!
//! A multi-tap gesture decoded upstream arrives here as a bare count. Counts
//! of three to five taps each map to one distinct command forwarded over the
//! external controller link; anything else is the defined "no command" input
//! and only clears the stored value.

use crate::diagnostics::{DiagnosticEventKind, DiagnosticsRecorder};
use crate::lifecycle::Tick;
use crate::platform::CommandLink;

/// Smallest tap count that carries a command.
pub const TAP_COMMAND_MIN: u8 = 3;

/// Largest tap count that carries a command.
pub const TAP_COMMAND_MAX: u8 = 5;

/// Commands forwarded to the external controller, keyed by tap count.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommandCode {
    Three,
    Four,
    Five,
}

impl CommandCode {
    /// Maps a tap count onto its command, if the count is in range.
    #[must_use]
    pub const fn from_taps(taps: u8) -> Option<Self> {
        match taps {
            3 => Some(CommandCode::Three),
            4 => Some(CommandCode::Four),
            5 => Some(CommandCode::Five),
            _ => None,
        }
    }

    /// Returns the tap count that produces this command.
    #[must_use]
    pub const fn taps(self) -> u8 {
        match self {
            CommandCode::Three => 3,
            CommandCode::Four => 4,
            CommandCode::Five => 5,
        }
    }

    /// Encodes the command for the controller link wire format.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        self.taps()
    }
}

/// Validates tap counts and forwards the resulting commands.
///
/// Stateless beyond the single stored count; not part of the lifecycle
/// state machine and free of timers.
#[derive(Debug)]
pub struct TapDispatcher<L> {
    link: L,
    last_taps: u8,
}

impl<L> TapDispatcher<L>
where
    L: CommandLink,
{
    /// Creates a dispatcher that forwards over the provided link.
    pub const fn new(link: L) -> Self {
        Self { link, last_taps: 0 }
    }

    /// Last valid tap count, or `0` when none is stored.
    #[must_use]
    pub const fn last_taps(&self) -> u8 {
        self.last_taps
    }

    /// Accesses the underlying command link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Processes a decoded tap count.
    ///
    /// In-range counts are stored, recorded, and forwarded as exactly one
    /// command; out-of-range counts clear the stored value and forward
    /// nothing.
    pub fn dispatch<const CAPACITY: usize>(
        &mut self,
        taps: u8,
        now: Tick,
        diagnostics: &mut DiagnosticsRecorder<CAPACITY>,
    ) -> Option<CommandCode> {
        match CommandCode::from_taps(taps) {
            Some(code) => {
                self.last_taps = taps;
                diagnostics.record(DiagnosticEventKind::TapAccepted { taps }, now);
                self.link.forward(code);
                Some(code)
            }
            None => {
                self.last_taps = 0;
                diagnostics.record(DiagnosticEventKind::TapCleared { taps }, now);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingLink {
        forwarded: heapless::Vec<CommandCode, 8>,
    }

    impl CommandLink for RecordingLink {
        fn forward(&mut self, code: CommandCode) {
            self.forwarded.push(code).expect("link capacity");
        }
    }

    fn dispatcher() -> (TapDispatcher<RecordingLink>, DiagnosticsRecorder<16>) {
        (
            TapDispatcher::new(RecordingLink::default()),
            DiagnosticsRecorder::new(),
        )
    }

    #[test]
    fn valid_counts_forward_distinct_commands() {
        let (mut taps, mut diagnostics) = dispatcher();
        assert_eq!(
            taps.dispatch(3, 0, &mut diagnostics),
            Some(CommandCode::Three)
        );
        assert_eq!(
            taps.dispatch(4, 1, &mut diagnostics),
            Some(CommandCode::Four)
        );
        assert_eq!(
            taps.dispatch(5, 2, &mut diagnostics),
            Some(CommandCode::Five)
        );
        assert_eq!(
            taps.link().forwarded.as_slice(),
            [CommandCode::Three, CommandCode::Four, CommandCode::Five]
        );
        assert_eq!(taps.last_taps(), 5);
    }

    #[test]
    fn out_of_range_counts_clear_without_forwarding() {
        let (mut taps, mut diagnostics) = dispatcher();
        taps.dispatch(4, 0, &mut diagnostics);
        assert_eq!(taps.last_taps(), 4);

        for invalid in [0u8, 2, 6, 250] {
            assert_eq!(taps.dispatch(invalid, 1, &mut diagnostics), None);
            assert_eq!(taps.last_taps(), 0);
        }
        assert_eq!(taps.link().forwarded.len(), 1);
    }

    #[test]
    fn boundary_counts_are_exact() {
        let (mut taps, mut diagnostics) = dispatcher();
        assert!(taps.dispatch(2, 0, &mut diagnostics).is_none());
        assert!(taps.dispatch(3, 1, &mut diagnostics).is_some());
        assert!(taps.dispatch(5, 2, &mut diagnostics).is_some());
        assert!(taps.dispatch(6, 3, &mut diagnostics).is_none());
    }

    #[test]
    fn dispatch_records_the_count() {
        let (mut taps, mut diagnostics) = dispatcher();
        taps.dispatch(4, 7, &mut diagnostics);
        taps.dispatch(9, 8, &mut diagnostics);
        let kinds: heapless::Vec<_, 4> =
            diagnostics.oldest_first().map(|record| record.kind).collect();
        assert_eq!(
            kinds.as_slice(),
            [
                DiagnosticEventKind::TapAccepted { taps: 4 },
                DiagnosticEventKind::TapCleared { taps: 9 },
            ]
        );
    }
}
