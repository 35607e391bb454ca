use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Ready state of a single socket, as the transport sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

/// Lock-free ready state shared between a socket task and its handle
#[derive(Debug)]
pub struct AtomicReadyState {
    inner: AtomicU8,
}

impl AtomicReadyState {
    pub fn new(state: ReadyState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ReadyState {
        ReadyState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ReadyState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    /// Move to `Closing` unless already closing or closed
    ///
    /// Returns `true` if this call performed the transition.
    pub fn begin_closing(&self) -> bool {
        let mut current = self.inner.load(Ordering::Acquire);
        loop {
            if current >= ReadyState::Closing as u8 {
                return false;
            }
            match self.inner.compare_exchange_weak(
                current,
                ReadyState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == ReadyState::Open
    }
}

/// Lifecycle state of a managed connection
///
/// ```text
/// Connecting → Open → Closing → Closed
///                 ↘ (unintentional close, policy allows) → ReconnectPending → Connecting …
///                 ↘ (retries exhausted) → Failed
/// ```
///
/// `Closed` and `Failed` are terminal until an explicit `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    ReconnectPending,
    Closed,
    Failed,
}

impl ConnectionState {
    /// No socket and nothing scheduled
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::ReconnectPending => "reconnect-pending",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}
