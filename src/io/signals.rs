//! Signal handling for the acquisition daemon.
//!
//! A dedicated thread turns Unix signals into [`SignalMessage`]s on an mpsc
//! channel polled by the daemon loop:
//!
//! - `SIGUSR1` requests an immediate acquisition cycle
//! - `SIGINT`, `SIGTERM` and `SIGHUP` request shutdown

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1},
    iterator::Signals,
};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

/// Messages delivered to the daemon loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMessage {
    /// Run an acquisition cycle now (SIGUSR1)
    Refresh,
    /// Stop the daemon (SIGTERM, SIGINT, SIGHUP)
    Shutdown,
}

/// Signal handling state shared between threads
pub struct SignalState {
    /// Cleared when a shutdown signal arrives
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
    /// Kept so in-process callers can inject messages
    pub signal_sender: Sender<SignalMessage>,
}

impl SignalState {
    /// State with no OS handler attached, for embedding and tests.
    pub fn detached() -> Self {
        let (signal_sender, signal_receiver) = channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            signal_receiver,
            signal_sender,
        }
    }
}

/// Register the handler thread and return the shared state.
pub fn setup_signal_handler() -> Result<SignalState> {
    let state = SignalState::detached();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR1])
        .context("failed to register signal handlers")?;

    let running = state.running.clone();
    let sender = state.signal_sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGUSR1 => {
                    log_pipe!();
                    log_info!("Received refresh signal");
                    if sender.send(SignalMessage::Refresh).is_err() {
                        break;
                    }
                }
                SIGTERM | SIGINT | SIGHUP => {
                    log_pipe!();
                    log_info!("Received shutdown signal");
                    running.store(false, Ordering::SeqCst);
                    let _ = sender.send(SignalMessage::Shutdown);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_state_relays_messages() {
        let state = SignalState::detached();
        assert!(state.running.load(Ordering::SeqCst));
        state.signal_sender.send(SignalMessage::Refresh).unwrap();
        assert_eq!(
            state.signal_receiver.try_recv().unwrap(),
            SignalMessage::Refresh
        );
    }
}
