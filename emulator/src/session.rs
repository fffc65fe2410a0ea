use std::fs;
use std::path::PathBuf;

use repeater_core::console::{self, Command};
use repeater_core::diagnostics::EventId;
use repeater_core::lifecycle::{LifecycleConfig, LinkActivity, RepeaterController, Tick};
use repeater_core::platform::{
    CommandLink, IdentStatus, IdentTransmitter, NoopDisplay, NoopPower, NoopRadio, StandbyStore,
};
use repeater_core::standby::StorageError;
use repeater_core::taps::{CommandCode, TapDispatcher};

/// Ticks advanced per poll while running the simulated clock. Small enough
/// to observe every dwell window and keep the watchdog fed.
const STEP_TICKS: Tick = 50;

/// Poll count of the simulated identification burst (10 s of morse).
const IDENT_BURST_POLLS: usize = 20;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "status",
        "status              - display controller state and schedule",
    ),
    (
        "standby",
        "standby <on|off>    - toggle the persisted permanent-standby flag",
    ),
    (
        "wake",
        "wake                - request an explicit wake from standby",
    ),
    (
        "tap",
        "tap <count>         - inject a decoded tap gesture",
    ),
    (
        "run",
        "run <n>[s|ms]       - advance the simulated clock (bare numbers are ticks)",
    ),
    (
        "session",
        "session <on|off>    - toggle the live transmit/receive session",
    ),
    (
        "help",
        "help [topic]        - show help for a command",
    ),
];

/// Where the standby byte lives for this session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreBacking {
    /// Volatile byte, lost when the emulator exits.
    Memory,
    /// Single-byte file surviving across emulator runs.
    File(PathBuf),
}

/// Standby store over the chosen backing.
///
/// The file variant reads the first byte of the file (a missing file reads
/// as a clear flag, like blank storage) and rewrites it on every persist.
pub struct EmuStore {
    backing: StoreBacking,
    byte: u8,
}

impl EmuStore {
    fn new(backing: StoreBacking) -> Self {
        Self { backing, byte: 0 }
    }
}

impl StandbyStore for EmuStore {
    fn load(&mut self, _address: u16) -> Result<u8, StorageError> {
        match &self.backing {
            StoreBacking::Memory => Ok(self.byte),
            StoreBacking::File(path) => {
                if !path.exists() {
                    return Ok(0);
                }
                let bytes = fs::read(path).map_err(|_| StorageError::Read)?;
                self.byte = bytes.first().copied().unwrap_or(0);
                Ok(self.byte)
            }
        }
    }

    fn persist(&mut self, _address: u16, byte: u8) -> Result<(), StorageError> {
        if let StoreBacking::File(path) = &self.backing {
            fs::write(path, [byte]).map_err(|_| StorageError::Write)?;
        }
        self.byte = byte;
        Ok(())
    }
}

/// Identification transmitter whose burst spans several polls of real
/// simulated time, like the hardware morse beacon.
#[derive(Default)]
struct SimIdent {
    remaining: usize,
}

impl IdentTransmitter for SimIdent {
    fn begin(&mut self) {
        self.remaining = IDENT_BURST_POLLS;
    }

    fn status(&mut self) -> IdentStatus {
        if self.remaining > 0 {
            self.remaining -= 1;
            IdentStatus::InProgress
        } else {
            IdentStatus::Complete
        }
    }
}

/// Command link retaining the most recent forwarded command.
#[derive(Default)]
struct EchoLink {
    last: Option<CommandCode>,
}

impl CommandLink for EchoLink {
    fn forward(&mut self, code: CommandCode) {
        self.last = Some(code);
    }
}

type EmuController = RepeaterController<NoopRadio, NoopDisplay, NoopPower, SimIdent, EmuStore>;

pub struct Session {
    controller: EmuController,
    taps: TapDispatcher<EchoLink>,
    now: Tick,
    link: LinkActivity,
    cursor: EventId,
}

impl Session {
    pub fn new(backing: StoreBacking) -> Self {
        let controller = RepeaterController::new(
            LifecycleConfig::default(),
            NoopRadio,
            NoopDisplay,
            NoopPower,
            SimIdent::default(),
            EmuStore::new(backing),
            0,
        );
        // Cursor starts at zero so the boot events show up on the first
        // command that drains them.
        Self {
            controller,
            taps: TapDispatcher::new(EchoLink::default()),
            now: 0,
            link: LinkActivity::Quiet,
            cursor: 0,
        }
    }

    pub fn handle_command(&mut self, line: &str) -> Vec<String> {
        let command = match console::parse(line) {
            Ok(command) => command,
            Err(err) => return vec![format!("ERR syntax {err}")],
        };

        match command {
            Command::Status => self.handle_status(),
            Command::Standby(enable) => self.handle_standby(enable),
            Command::Wake => self.handle_wake(),
            Command::Tap(count) => self.handle_tap(count),
            Command::Run(ticks) => self.handle_run(ticks),
            Command::Session(active) => self.handle_session(active),
            Command::Help(topic) => handle_help(topic),
        }
    }

    fn handle_status(&mut self) -> Vec<String> {
        let mut lines = vec![
            format!("state: {}", self.controller.state()),
            format!(
                "permanent standby: {}",
                if self.controller.permanent_standby() {
                    "on"
                } else {
                    "off"
                }
            ),
            format!("tick: {}", self.now),
            format!("next wake: tick {}", self.controller.next_wake_at()),
            format!(
                "live session: {}",
                if self.link == LinkActivity::Engaged {
                    "engaged"
                } else {
                    "quiet"
                }
            ),
        ];
        match self.taps.last_taps() {
            0 => lines.push("stored tap command: none".to_string()),
            taps => lines.push(format!("stored tap command: {taps}")),
        }
        match self.taps.link().last {
            Some(code) => lines.push(format!("last forwarded command: {}", code.taps())),
            None => lines.push("last forwarded command: none".to_string()),
        }
        lines
    }

    fn handle_standby(&mut self, enable: bool) -> Vec<String> {
        let mut lines = match self.controller.set_permanent_standby(enable, self.now) {
            Ok(()) => vec![format!(
                "permanent standby {}",
                if enable { "enabled" } else { "disabled" }
            )],
            Err(err) => vec![format!("ERR storage {err}")],
        };
        lines.extend(self.drain_events());
        lines
    }

    fn handle_wake(&mut self) -> Vec<String> {
        let mut lines = if self.controller.request_wake(self.now) {
            vec!["wake request honored".to_string()]
        } else {
            vec![format!(
                "wake request ignored (state: {})",
                self.controller.state()
            )]
        };
        lines.extend(self.drain_events());
        lines
    }

    fn handle_tap(&mut self, count: u8) -> Vec<String> {
        let outcome = self
            .taps
            .dispatch(count, self.now, self.controller.diagnostics_mut());
        let mut lines = match outcome {
            Some(code) => vec![format!("forwarded tap command {}", code.taps())],
            None => vec![format!("tap count {count} out of range, command cleared")],
        };
        lines.extend(self.drain_events());
        lines
    }

    fn handle_run(&mut self, ticks: Tick) -> Vec<String> {
        let target = self.now.saturating_add(ticks);
        while self.now < target {
            self.now = (self.now + STEP_TICKS).min(target);
            let _ = self.controller.poll(self.now, self.link);
        }
        let mut lines = vec![format!(
            "advanced {ticks} ticks to tick {} (state: {})",
            self.now,
            self.controller.state()
        )];
        lines.extend(self.drain_events());
        lines
    }

    fn handle_session(&mut self, active: bool) -> Vec<String> {
        self.link = if active {
            LinkActivity::Engaged
        } else {
            LinkActivity::Quiet
        };
        vec![format!(
            "live session {}",
            if active { "started" } else { "ended" }
        )]
    }

    /// Formats the diagnostic events recorded since the previous command.
    fn drain_events(&mut self) -> Vec<String> {
        let lines = self
            .controller
            .diagnostics()
            .oldest_first()
            .filter(|record| record.id >= self.cursor)
            .map(|record| format!("[tick {}] {}", record.tick, record.kind))
            .collect();
        self.cursor = self.controller.diagnostics().next_event_id();
        lines
    }
}

fn handle_help(topic: Option<&str>) -> Vec<String> {
    match topic {
        None => HELP_TOPICS
            .iter()
            .map(|(_, usage)| (*usage).to_string())
            .collect(),
        Some(topic) => match HELP_TOPICS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(topic))
        {
            Some((_, usage)) => vec![(*usage).to_string()],
            None => vec![format!("No help for `{topic}`")],
        },
    }
}
