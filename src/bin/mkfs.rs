use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use fs_sim::{disk_format::block::DISK_SIZE, storage::FileBackedStorage};

#[derive(Parser)]
struct Args {
    /// Disk image file to create
    disk_file: PathBuf,
    /// Overwrite the file if it already exists
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    FileBackedStorage::create(&args.disk_file, args.force)?;

    info!("wrote {DISK_SIZE} bytes to {}", args.disk_file.display());

    Ok(())
}
