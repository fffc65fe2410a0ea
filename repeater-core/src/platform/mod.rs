//! Capability traits the surrounding application implements for its board.
//!
//! The lifecycle controller never touches hardware directly. Each external
//! collaborator is a narrow trait with a no-op implementation, so firmware
//! can supply real drivers while unit tests and the emulator swap in
//! recording doubles.

use crate::standby::StorageError;
use crate::taps::CommandCode;

/// Transceiver power and configuration control.
pub trait RadioControl {
    /// Powers the transceiver down into its idle state.
    fn idle(&mut self);

    /// Reconfigures the transceiver for active operation.
    fn activate(&mut self);

    /// Writes the application-owned receiver idle-mode flag.
    ///
    /// Cleared by the controller on every wake path so the receiver is
    /// trusted to detect channel activity again.
    fn set_receiver_idle(&mut self, idle: bool);
}

/// Display power control.
pub trait DisplayControl {
    /// Puts the display to sleep.
    fn sleep(&mut self);
}

/// Hardware low-power mode control.
pub trait PowerControl {
    /// Requests entry into the hardware low-power mode.
    fn enter_low_power(&mut self);
}

/// Progress reported by an in-flight identification burst.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IdentStatus {
    /// The burst is still being transmitted.
    InProgress,
    /// The burst has finished (or no burst is running).
    Complete,
}

/// Morse-code identification transmitter.
///
/// The encoding is the collaborator's business; the controller only starts
/// the burst when entering the identification phase and polls for
/// completion instead of blocking the cooperative loop.
pub trait IdentTransmitter {
    /// Starts the identification burst.
    fn begin(&mut self);

    /// Reports the progress of the current burst.
    fn status(&mut self) -> IdentStatus;
}

/// Persistent storage for the standby configuration byte.
pub trait StandbyStore {
    /// Reads the configuration byte at the given address.
    fn load(&mut self, address: u16) -> Result<u8, StorageError>;

    /// Writes the configuration byte at the given address.
    fn persist(&mut self, address: u16, byte: u8) -> Result<(), StorageError>;
}

/// Channel towards the external controller that consumes tap commands.
pub trait CommandLink {
    /// Forwards a decoded tap command.
    fn forward(&mut self, code: CommandCode);
}

/// Radio double that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopRadio;

impl RadioControl for NoopRadio {
    fn idle(&mut self) {}

    fn activate(&mut self) {}

    fn set_receiver_idle(&mut self, _: bool) {}
}

/// Display double that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopDisplay;

impl DisplayControl for NoopDisplay {
    fn sleep(&mut self) {}
}

/// Power double that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopPower;

impl PowerControl for NoopPower {
    fn enter_low_power(&mut self) {}
}

/// Transmitter double whose bursts finish instantly.
///
/// Reproduces the one-shot ordering of a blocking transmitter: the
/// identification phase is observed for exactly one poll before the
/// controller moves on to listening.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopIdent;

impl IdentTransmitter for NoopIdent {
    fn begin(&mut self) {}

    fn status(&mut self) -> IdentStatus {
        IdentStatus::Complete
    }
}

/// Command link double that drops every forwarded command.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopLink;

impl CommandLink for NoopLink {
    fn forward(&mut self, _: CommandCode) {}
}

/// In-memory standby store backed by a single byte.
///
/// Useful for tests and host tooling that does not need the byte to
/// survive a process restart.
#[derive(Copy, Clone, Debug, Default)]
pub struct MemoryStore {
    byte: u8,
}

impl MemoryStore {
    /// Creates a store holding the provided initial byte.
    #[must_use]
    pub const fn new(byte: u8) -> Self {
        Self { byte }
    }

    /// Returns the currently stored byte.
    #[must_use]
    pub const fn byte(&self) -> u8 {
        self.byte
    }
}

impl StandbyStore for MemoryStore {
    fn load(&mut self, _: u16) -> Result<u8, StorageError> {
        Ok(self.byte)
    }

    fn persist(&mut self, _: u16, byte: u8) -> Result<(), StorageError> {
        self.byte = byte;
        Ok(())
    }
}
