//! AT-command modem simulator: bridges a serial line to live TCP networking
//!
//! Usage:
//!   modemsim <tcp_port> <serial_port> [--baud <rate>] [--framing <NPS>] [-v]

use anyhow::Context;
use clap::Parser;
use modemsim::cli::Cli;
use modemsim::config::SerialConfig;
use modemsim::dispatcher::CommandDispatcher;
use modemsim::event_loop::{self, EventLoop};
use modemsim::serial::SerialPort;
use modemsim::{constants, logging};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    info!(
        "starting modemsim v{} on {} (tcp port {}, baud {}, framing {})",
        constants::MODEM_VERSION,
        cli.serial_port.display(),
        cli.tcp_port,
        cli.baud,
        cli.framing
    );

    let config = SerialConfig::new(&cli.serial_port, cli.baud, &cli.framing)
        .context("invalid serial configuration")?;

    let serial: Box<dyn modemsim::serial::Line> =
        Box::new(SerialPort::open(config).context("failed to open serial port")?);
    let dispatcher = CommandDispatcher::new(cli.baud);
    let shutdown = event_loop::spawn_shutdown_listener();

    let mut event_loop = EventLoop::new(serial, dispatcher, shutdown);
    event_loop.run().context("event loop failed")?;

    info!("modemsim exiting");
    Ok(())
}
