//! Core event types and channel helpers for Practica.
//!
//! The runtime uses a single bounded mpsc channel: the async input service,
//! the tick source, and completion notifications from execution / highlight
//! tasks all converge here and are consumed by one event loop. With a small
//! fixed set of producers the bounded channel provides memory safety and
//! natural backpressure; events are never dropped, producers park until
//! space is available. Send failures (consumer gone during shutdown) are
//! counted rather than treated as errors.

use std::fmt;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Capacity of the runtime event channel.
pub const EVENT_CHANNEL_CAP: usize = 1024;

// Telemetry counters (relaxed atomics, inspected by tests and periodic logs).
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static KEYPRESS_TOTAL: AtomicU64 = AtomicU64::new(0);
/// Execution responses that arrived for a superseded session or run and
/// were silently dropped.
pub static EXEC_RESPONSES_DISCARDED: AtomicU64 = AtomicU64::new(0);

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    /// A remote execution round-trip finished (successfully or not).
    Exec(ExecCompletion),
    /// The shared highlight grammar finished (or failed) its one-time load.
    Highlight(HighlightEvent),
    /// Periodic monotonic tick driving the running-indicator animation and
    /// other lightweight refreshes without busy polling.
    Tick,
    Shutdown,
}

/// Normalized input events.
#[derive(Debug, Clone)]
pub enum InputEvent {
    Key(KeyEvent),
    /// Terminal resize (columns, rows).
    Resize(u16, u16),
    /// Ctrl-C surfaced distinctly so the loop can treat it as quit even
    /// while the editor has focus.
    CtrlC,
}

/// Identity of an in-flight execution request: the session that issued it
/// plus that session's run sequence number. Completions are matched against
/// the *current* session identity at arrival; mismatches are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunTicketId {
    pub session: u64,
    pub seq: u64,
}

impl fmt::Display for RunTicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.session, self.seq)
    }
}

/// Wire-level outcome of one execution round-trip, before the session maps
/// it onto the output panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The collaborator returned captured output (possibly empty).
    Completed(String),
    /// The collaborator answered but the result was malformed or absent.
    RemoteFailure,
    /// The request never completed a network round-trip.
    TransportFailure,
}

#[derive(Debug, Clone)]
pub struct ExecCompletion {
    pub ticket: RunTicketId,
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightEvent {
    Ready,
    Failed,
}

// -------------------------------------------------------------------------
// Async event sources
// -------------------------------------------------------------------------

/// Trait implemented by any async event producer. Implementors hold their
/// configuration and spawn one background task that pushes `Event`s into
/// the shared channel. A source must terminate promptly when
/// `tx.send(..).await` returns `Err` (consumer dropped).
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used for logging / diagnostics.
    fn name(&self) -> &'static str;
    /// Consume self and spawn the background task.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources, spawned together at startup.
#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    /// Spawn all registered sources, returning their JoinHandles. Sources
    /// are drained so a second call spawns nothing. During shutdown the
    /// caller drops its final `Sender` clone before awaiting the handles so
    /// the sources observe the closed channel and exit cooperatively.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            tracing::info!(target: "runtime.events", source = src.name(), "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Built-in monotonic tick source. Emits `Event::Tick` every interval.
pub struct TickEventSource {
    interval: std::time::Duration,
}

impl TickEventSource {
    pub fn new(interval: std::time::Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        })
    }
}

// -------------------------------------------------------------------------
// Key model
// -------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyEvent {
    pub fn plain(code: KeyCode) -> Self {
        Self {
            code,
            mods: KeyModifiers::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const CTRL = 0b0000_0001;
        const ALT  = 0b0000_0010;
        const SHIFT= 0b0000_0100;
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?}", self.code, self.mods)
    }
}
