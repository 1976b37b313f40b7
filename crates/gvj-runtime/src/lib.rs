#![forbid(unsafe_code)]

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Asynchronous error status reported by the device runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Success,
    InvalidValue,
    MemoryAllocation,
    LaunchFailure,
    IllegalAddress,
}

impl DeviceStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InvalidValue => 1,
            Self::MemoryAllocation => 2,
            Self::LaunchFailure => 719,
            Self::IllegalAddress => 700,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::InvalidValue => "invalid_value",
            Self::MemoryAllocation => "memory_allocation",
            Self::LaunchFailure => "launch_failure",
            Self::IllegalAddress => "illegal_address",
        }
    }

    #[must_use]
    pub const fn is_clear(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Process-wide device error state.
///
/// The harness only observes it; clearing belongs to whoever raised it.
pub trait DeviceRuntime {
    fn peek_last_error(&self) -> DeviceStatus;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceErrorEvent {
    pub ts_millis: u128,
    pub status: DeviceStatus,
    pub note: String,
}

#[derive(Debug, Default, Clone)]
pub struct ErrorLedger {
    events: Vec<DeviceErrorEvent>,
}

impl ErrorLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: DeviceErrorEvent) {
        self.events.push(event);
    }

    #[must_use]
    pub fn events(&self) -> &[DeviceErrorEvent] {
        &self.events
    }

    #[must_use]
    pub fn last(&self) -> Option<&DeviceErrorEvent> {
        self.events.last()
    }
}

#[derive(Debug)]
struct DeviceState {
    last_error: DeviceStatus,
    ledger: ErrorLedger,
}

/// Host-side stand-in for a device context.
#[derive(Debug)]
pub struct HostDevice {
    state: Mutex<DeviceState>,
}

impl HostDevice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DeviceState {
                last_error: DeviceStatus::Success,
                ledger: ErrorLedger::new(),
            }),
        }
    }

    /// Records an asynchronous error; it stays visible until taken.
    pub fn raise(&self, status: DeviceStatus, note: impl Into<String>) {
        if status.is_clear() {
            return;
        }
        let ts_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        if let Ok(mut state) = self.state.lock() {
            state.last_error = status;
            state.ledger.record(DeviceErrorEvent {
                ts_millis,
                status,
                note: note.into(),
            });
        }
    }

    /// Returns the last error and resets the state to `Success`.
    pub fn take_last_error(&self) -> DeviceStatus {
        self.state.lock().map_or(DeviceStatus::Success, |mut state| {
            std::mem::replace(&mut state.last_error, DeviceStatus::Success)
        })
    }

    #[must_use]
    pub fn ledger(&self) -> ErrorLedger {
        self.state
            .lock()
            .map(|state| state.ledger.clone())
            .unwrap_or_default()
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRuntime for HostDevice {
    fn peek_last_error(&self) -> DeviceStatus {
        // A poisoned lock means a raiser panicked mid-update; report it as dirty.
        self.state
            .lock()
            .map_or(DeviceStatus::IllegalAddress, |state| state.last_error)
    }
}
