//! Main event loop (spec.md §4.7)
//!
//! Grounded on `modemsimul.py::simul`'s drain-then-dispatch-or-accept loop
//! and the teacher's `main.rs::run_headless` shutdown-flag wiring. The
//! core stays single-threaded (spec.md §5); only the Ctrl-C/SIGTERM
//! listener runs on its own thread, setting an `AtomicBool` the main loop
//! polls each iteration.

use crate::constants::EVENT_LOOP_IDLE_MS;
use crate::dispatcher::CommandDispatcher;
use crate::error::Result;
use crate::serial::Line;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct EventLoop {
    serial: Box<dyn Line>,
    dispatcher: CommandDispatcher,
    shutdown: Arc<AtomicBool>,
}

impl EventLoop {
    pub fn new(
        serial: Box<dyn Line>,
        dispatcher: CommandDispatcher,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            serial,
            dispatcher,
            shutdown,
        }
    }

    /// Drive the modem until a shutdown signal arrives.
    pub fn run(&mut self) -> Result<()> {
        info!("event loop started");

        while !self.shutdown.load(Ordering::SeqCst) {
            let mut did_work = false;

            if let Some(chunk) = self.serial.drain_all_text()? {
                did_work = true;
                self.dispatcher.process_chunk(&mut self.serial, &chunk)?;
            }

            let accepted = self.dispatcher.servers_mut().poll_accepts();
            for (port, stream, addr) in accepted {
                did_work = true;
                debug!("accepted connection on port {} from {}", port, addr);
                self.dispatcher
                    .announce_and_bridge(&mut self.serial, stream, addr)?;
            }

            if !did_work {
                std::thread::sleep(Duration::from_millis(EVENT_LOOP_IDLE_MS));
            }
        }

        info!("event loop stopping");
        Ok(())
    }
}

/// Spawn the Ctrl-C/SIGTERM listener. Runs a minimal single-threaded tokio
/// runtime on a dedicated OS thread purely to get `tokio::signal`'s
/// portable notification; it never touches the modem state directly.
pub fn spawn_shutdown_listener() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(_) => return,
        };

        rt.block_on(async move {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate(),
                ) {
                    Ok(s) => s,
                    Err(_) => return,
                };

                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = tokio::signal::ctrl_c() => {},
                }
            }

            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }

            shutdown_clone.store(true, Ordering::SeqCst);
        });
    });

    shutdown
}
