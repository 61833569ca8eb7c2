// CLASSIFICATION: COMMUNITY
// Filename: sysinfo_collect.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

use std::path::PathBuf;

use clap::Parser;
use log::info;

use rebootlog::collect::{self, CollectFlags, CollectSources};

#[derive(Parser)]
#[command(
    about = "Copy system and process diagnostics into a directory",
    after_help = "example: sysinfo-collect -d /mnt/mtd/sysinfo -p 1,2 -f 15"
)]
struct Cli {
    /// Output directory
    #[arg(short = 'd')]
    dir: PathBuf,
    /// Comma-separated pids
    #[arg(short = 'p')]
    pids: Option<String>,
    /// Bitmask: 1 kmsg, 2 meminfo, 4 maps, 8 fd
    #[arg(short = 'f', default_value_t = CollectFlags::all().bits())]
    flags: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let pids = cli.pids.as_deref().map(collect::parse_pids).unwrap_or_default();
    let flags = CollectFlags::from_bits_truncate(cli.flags);
    let report = collect::collect(&cli.dir, &pids, flags, &CollectSources::default())?;
    info!(
        "collected {} files into {} ({} skipped)",
        report.written.len(),
        cli.dir.display(),
        report.skipped.len()
    );
    Ok(())
}
