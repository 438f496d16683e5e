//! Async input service: crossterm `EventStream` → normalized events on the
//! shared runtime channel.
//!
//! One tokio task owns the terminal event stream for the lifetime of the
//! application. It exits when the channel closes, the stream ends or
//! errors, or the shutdown handle fires; the exit reason is logged so a
//! wedged terminal can be diagnosed from `practica.log`.

mod keymap;

pub use keymap::map_key_event;

use core_events::{CHANNEL_SEND_FAILURES, Event, InputEvent, KEYPRESS_TOTAL};
use crossterm::event::{Event as CEvent, EventStream};
use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{Notify, mpsc::Sender};
use tokio::task;
use tokio_stream::StreamExt;
use tracing::{debug, info, trace};

/// Handle used by the event loop to stop the input task during shutdown.
#[derive(Clone, Debug)]
pub struct InputShutdown {
    notify: Arc<Notify>,
}

impl InputShutdown {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

#[derive(Clone, Debug)]
struct ShutdownListener {
    notify: Arc<Notify>,
}

impl ShutdownListener {
    fn new_pair() -> (InputShutdown, Self) {
        let notify = Arc::new(Notify::new());
        (
            InputShutdown {
                notify: notify.clone(),
            },
            ShutdownListener { notify },
        )
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Spawn the input task reading the real terminal event stream.
pub fn spawn_input_task(sender: Sender<Event>) -> (task::JoinHandle<()>, InputShutdown) {
    let (shutdown, listener) = ShutdownListener::new_pair();
    let handle = task::spawn(async move {
        let stream = EventStream::new();
        InputStreamTask::new(sender, stream, listener).run().await;
    });
    (handle, shutdown)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExitReason {
    ShutdownSignal,
    ChannelClosed,
    StreamEnded,
    StreamError,
}

impl ExitReason {
    fn as_str(&self) -> &'static str {
        match self {
            ExitReason::ShutdownSignal => "shutdown_signal",
            ExitReason::ChannelClosed => "channel_closed",
            ExitReason::StreamEnded => "stream_ended",
            ExitReason::StreamError => "stream_error",
        }
    }
}

struct InputStreamTask<S>
where
    S: tokio_stream::Stream<Item = io::Result<CEvent>> + Send + Unpin + 'static,
{
    sender: Sender<Event>,
    stream: S,
    shutdown: ShutdownListener,
}

impl<S> InputStreamTask<S>
where
    S: tokio_stream::Stream<Item = io::Result<CEvent>> + Send + Unpin + 'static,
{
    fn new(sender: Sender<Event>, stream: S, shutdown: ShutdownListener) -> Self {
        Self {
            sender,
            stream,
            shutdown,
        }
    }

    async fn run(mut self) {
        info!(target: "input.thread", "input_task_started");
        let mut exit = ExitReason::StreamEnded;
        loop {
            let maybe = tokio::select! {
                biased;
                _ = self.shutdown.wait() => {
                    exit = ExitReason::ShutdownSignal;
                    break;
                }
                result = self.stream.next() => result,
            };

            let Some(result) = maybe else {
                break;
            };

            match result {
                Ok(CEvent::Key(key)) => {
                    let Some(event) = map_key_event(key) else {
                        continue;
                    };
                    if matches!(event, InputEvent::Key(_)) {
                        KEYPRESS_TOTAL.fetch_add(1, Ordering::Relaxed);
                    }
                    trace!(target: "input.event", ?event, "key");
                    if !self.send(Event::Input(event)).await {
                        exit = ExitReason::ChannelClosed;
                        break;
                    }
                }
                Ok(CEvent::Resize(w, h)) => {
                    trace!(target: "input.event", w, h, "resize");
                    if !self.send(Event::Input(InputEvent::Resize(w, h))).await {
                        exit = ExitReason::ChannelClosed;
                        break;
                    }
                }
                Ok(_) => {
                    // Mouse / focus / paste events are not part of the
                    // interaction model; ignore without logging noise.
                }
                Err(err) => {
                    debug!(target: "input.thread", ?err, "stream_error");
                    exit = ExitReason::StreamError;
                    break;
                }
            }
        }
        info!(target: "input.thread", reason = exit.as_str(), "input_task_stopped");
    }

    async fn send(&self, event: Event) -> bool {
        if self.sender.send(event).await.is_err() {
            CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{KeyCode, KeyModifiers};
    use crossterm::event::{
        KeyCode as CKeyCode, KeyEvent as CKeyEvent, KeyModifiers as CMods,
    };
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    fn press(code: CKeyCode, mods: CMods) -> io::Result<CEvent> {
        Ok(CEvent::Key(CKeyEvent::new(code, mods)))
    }

    #[tokio::test]
    async fn forwards_keys_and_resize_in_order() {
        let (raw_tx, raw_rx) = mpsc::channel(8);
        let (tx, mut rx) = mpsc::channel(8);
        let (_shutdown, listener) = ShutdownListener::new_pair();
        let task = tokio::spawn(
            InputStreamTask::new(tx, ReceiverStream::new(raw_rx), listener).run(),
        );

        raw_tx.send(press(CKeyCode::Char('x'), CMods::NONE)).await.unwrap();
        raw_tx.send(Ok(CEvent::Resize(80, 24))).await.unwrap();
        drop(raw_tx);

        match rx.recv().await {
            Some(Event::Input(InputEvent::Key(k))) => {
                assert_eq!(k.code, KeyCode::Char('x'));
                assert_eq!(k.mods, KeyModifiers::empty());
            }
            other => panic!("expected key event, got {other:?}"),
        }
        match rx.recv().await {
            Some(Event::Input(InputEvent::Resize(80, 24))) => {}
            other => panic!("expected resize, got {other:?}"),
        }

        tokio::time::timeout(Duration::from_millis(100), task)
            .await
            .expect("task should stop when the raw stream ends")
            .unwrap();
    }

    #[tokio::test]
    async fn ctrl_c_is_surfaced_distinctly() {
        let (raw_tx, raw_rx) = mpsc::channel(8);
        let (tx, mut rx) = mpsc::channel(8);
        let (_shutdown, listener) = ShutdownListener::new_pair();
        let task = tokio::spawn(
            InputStreamTask::new(tx, ReceiverStream::new(raw_rx), listener).run(),
        );

        raw_tx.send(press(CKeyCode::Char('c'), CMods::CONTROL)).await.unwrap();
        drop(raw_tx);

        match rx.recv().await {
            Some(Event::Input(InputEvent::CtrlC)) => {}
            other => panic!("expected CtrlC, got {other:?}"),
        }
        let _ = tokio::time::timeout(Duration::from_millis(100), task).await;
    }

    #[tokio::test]
    async fn shutdown_signal_stops_task() {
        let (_raw_tx, raw_rx) = mpsc::channel::<io::Result<CEvent>>(8);
        let (tx, _rx) = mpsc::channel(8);
        let (shutdown, listener) = ShutdownListener::new_pair();
        let task = tokio::spawn(
            InputStreamTask::new(tx, ReceiverStream::new(raw_rx), listener).run(),
        );

        shutdown.signal();
        tokio::time::timeout(Duration::from_millis(200), task)
            .await
            .expect("task should observe shutdown signal")
            .unwrap();
    }
}
