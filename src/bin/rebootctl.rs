// CLASSIFICATION: COMMUNITY
// Filename: rebootctl.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Field tool for inspecting and updating the reboot-reason register.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use rebootlog::config::{parse_offset, DEFAULT_CMOS_OFFSET};
use rebootlog::query::render_history;
use rebootlog::register::store::RegisterStore;
use rebootlog::{ReasonCode, RebootTracker, TrackerError};

#[derive(Parser)]
#[command(about = "Reboot reason register utilities")]
struct Cli {
    /// Register device node
    #[arg(long, default_value = "/dev/nvram")]
    device: PathBuf,
    /// Register offset within the device (decimal or 0x-hex)
    #[arg(long, value_parser = parse_offset_arg)]
    offset: Option<u8>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the last three reboot reasons
    Show,
    /// Rotate history as done at boot
    Shift,
    /// Record the reason for the running boot
    Record { reason: ReasonCode },
    /// Flag the running boot as out-of-memory
    Oom,
    /// Dump the raw register value
    Raw,
}

fn parse_offset_arg(text: &str) -> Result<u8, String> {
    parse_offset(text).ok_or_else(|| format!("invalid register offset {text:?}"))
}

#[cfg(unix)]
fn open_store(device: &Path) -> anyhow::Result<Box<dyn RegisterStore>> {
    use anyhow::Context;
    use rebootlog::register::store::NvramStore;

    let store =
        NvramStore::open(device).with_context(|| format!("opening {}", device.display()))?;
    Ok(Box::new(store))
}

#[cfg(not(unix))]
fn open_store(device: &Path) -> anyhow::Result<Box<dyn RegisterStore>> {
    anyhow::bail!("{}: register devices are only supported on unix hosts", device.display())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let store = open_store(&cli.device)?;
    let tracker = RebootTracker::new(store, cli.offset.unwrap_or(DEFAULT_CMOS_OFFSET));

    match cli.cmd {
        Cmd::Show => match tracker.query_history() {
            Ok(history) => print!("{}", render_history(&history)),
            Err(TrackerError::InvalidMagic(_)) => println!("no reboot history"),
            Err(err) => return Err(err.into()),
        },
        Cmd::Shift => {
            let reg = tracker.shift()?;
            println!("register now {reg}");
        }
        Cmd::Record { reason } => {
            tracker.record_reason(reason)?;
            println!("recorded: {reason}");
        }
        Cmd::Oom => {
            tracker.flag_oom()?;
            println!("oom flagged");
        }
        Cmd::Raw => {
            let reg = tracker.read_raw()?;
            let decoded = reg.decode();
            println!("raw: {reg} (magic {:#x}, valid {})", reg.magic(), decoded.valid);
            println!("current: {}", decoded.current);
            for (index, slot) in decoded.history.iter().enumerate() {
                println!("history[{index}]: {slot}");
            }
        }
    }
    Ok(())
}
