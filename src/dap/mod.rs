mod protocol;
mod server;

use std::io;
use tracing::info;

pub use protocol::{read_message, write_message, DapMessage, DapMessageContent};
pub use server::DapServer;

/// Serve DAP over stdio. Logging goes to stderr so stdout carries only protocol frames.
pub fn run_dap_mode() -> io::Result<()> {
    info!("dap server starting");
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut server = DapServer::new(io::stdout());
    server.run(&mut reader)?;
    info!("dap server exiting");
    Ok(())
}
