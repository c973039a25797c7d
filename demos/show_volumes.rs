//! Print the targets, LUNs and sessions the running daemon knows about
//!
//! Usage: cargo run --example show_volumes -- [proc dir]
//!
//! Defaults to /proc/net/iet.

use iet_config::procfs::ProcParser;
use iet_config::FileBackend;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/proc/net/iet"));

    let volumes = ProcParser::new(FileBackend::new(dir.join("volume"))).volumes(None)?;
    let sessions = ProcParser::new(FileBackend::new(dir.join("session"))).sessions(None)?;

    if volumes.is_empty() {
        println!("No targets configured");
        return Ok(());
    }

    for volume in &volumes {
        println!("tid {}: {}", volume.tid, volume.name);
        for lun in &volume.luns {
            println!(
                "  lun {} {} ({}, {})",
                lun.get("lun").unwrap_or("?"),
                lun.get("path").unwrap_or("?"),
                lun.get("iotype").unwrap_or("?"),
                lun.get("iomode").unwrap_or("?")
            );
        }

        let target_sessions = sessions
            .iter()
            .find(|s| s.tid == volume.tid)
            .map(|s| s.sessions.as_slice())
            .unwrap_or_default();
        for session in target_sessions {
            let ips: Vec<&str> = session
                .connections
                .iter()
                .filter_map(|c| c.get("ip"))
                .collect();
            println!("  session {} from {} [{}]", session.sid, session.initiator, ips.join(", "));
        }
        println!();
    }

    Ok(())
}
