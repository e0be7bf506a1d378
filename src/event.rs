use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use tokio::sync::mpsc;

use crate::error::Result;

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A periodic tick for rendering.
    Tick,
    /// Terminal resize event.
    Resize(u16, u16),
    /// The external editor exited and the terminal is ours again. Carries the
    /// failure message, if any.
    EditorExited(Option<String>),
}

/// Async event handler that polls crossterm events and forwards them via a channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
    /// While set, the terminal is not read at all.
    paused: Arc<AtomicBool>,
    tick_rate: Duration,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();
        let paused = Arc::new(AtomicBool::new(false));
        let paused_reader = paused.clone();

        tokio::spawn(async move {
            loop {
                if paused_reader.load(Ordering::Acquire) {
                    tokio::time::sleep(tick_rate).await;
                    continue;
                }
                if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(CrosstermEvent::Key(key)) => {
                            if event_tx.send(Event::Key(key)).is_err() {
                                break;
                            }
                        }
                        Ok(CrosstermEvent::Resize(w, h)) => {
                            if event_tx.send(Event::Resize(w, h)).is_err() {
                                break;
                            }
                        }
                        _ => {}
                    }
                } else if event_tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        });

        Self {
            rx,
            tx,
            paused,
            tick_rate,
        }
    }

    /// Get a sender clone for synthesized events.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Stop reading the terminal and wait until any in-flight poll is over.
    pub async fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        tokio::time::sleep(self.tick_rate * 2).await;
    }

    /// Start reading the terminal again.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| crate::error::AppError::Terminal("Event channel closed".into()))
    }
}
