//! Event bus for gaitview.
//!
//! Terminal input, timers, backend replies and live-channel traffic all arrive
//! as one `AppEvent` over a tokio unbounded MPSC channel. The main loop is the
//! only consumer, so every state change happens on one thread.
//!
//! Two independent intervals drive the loop:
//! - **Render interval** (33 ms) triggers a `terminal.draw()` call.
//! - **Tick interval** (250 ms) drives status expiry and other timed updates.

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::{FutureExt, StreamExt};
use gaitview_core::engine::BackendReply;
use gaitview_core::events::PushFrame;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Connection lifecycle and traffic from the live dashboard channel.
#[derive(Debug)]
pub enum LiveEvent {
    Connecting,
    Connected,
    /// The socket closed or could not be opened.
    Disconnected(String),
    Frame(Box<PushFrame>),
}

/// All events the application can receive from any source.
#[derive(Debug)]
#[non_exhaustive]
pub enum AppEvent {
    /// A key press (`KeyEventKind::Press` only; release and repeat are dropped).
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Terminal was resized to (columns, rows).
    Resize(u16, u16),
    /// Logic tick (250 ms).
    Tick,
    /// Render tick (33 ms).
    Render,
    /// A reply from the backend worker thread.
    Backend(Box<BackendReply>),
    Live(LiveEvent),
    Quit,
}

/// Holds the sender and receiver ends of the unified event channel.
///
/// Clone `tx` for each producer; `rx` is owned by the main loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the task that turns terminal input and timers into [`AppEvent`]s.
///
/// `reader.next().fuse()` keeps `tokio::select!` from polling a finished
/// stream if crossterm ever terminates it. Send errors are ignored: once the
/// receiver is gone the process is shutting down.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_millis(250));
        let mut render_interval = interval(Duration::from_millis(33));
        let mut reader = EventStream::new();

        loop {
            let tick_tick = tick_interval.tick();
            let render_tick = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            tokio::select! {
                _ = tick_tick => {
                    let _ = tx.send(AppEvent::Tick);
                }
                _ = render_tick => {
                    let _ = tx.send(AppEvent::Render);
                }
                maybe_event = crossterm_event => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            let _ = tx.send(AppEvent::Key(key));
                        }
                        Some(Ok(Event::Resize(w, h))) => {
                            let _ = tx.send(AppEvent::Resize(w, h));
                        }
                        Some(Ok(Event::Mouse(mouse))) => {
                            let _ = tx.send(AppEvent::Mouse(mouse));
                        }
                        _ => {}
                    }
                }
            }
        }
    });
}
