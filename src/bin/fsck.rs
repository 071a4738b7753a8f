use std::{fs::File, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use fs_sim::{
    consistency::check_consistency,
    disk_format::{block::SUPERBLOCK_NUMBER, superblock::Superblock},
    storage::{BlockStorage, FileBackedStorage},
};

#[derive(Parser)]
struct Args {
    /// Disk image file
    disk_file: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let disk_name = args.disk_file.display();

    let disk_file = File::options()
        .read(true)
        .open(&args.disk_file)
        .with_context(|| format!("Cannot find disk {disk_name}"))?;
    let storage = FileBackedStorage::new(disk_file);

    let block = storage.read_block(SUPERBLOCK_NUMBER)?;
    let superblock = Superblock::from_block(&block)?;

    if let Err(rule) = check_consistency(&superblock) {
        bail!(
            "File system in {disk_name} is inconsistent (error code: {}): {rule:?}",
            rule.code()
        );
    }

    info!(
        "{} inodes used, {} blocks used",
        superblock.inodes.iter().filter(|inode| inode.is_used()).count(),
        superblock.free_space.count_used()
    );
    println!("{disk_name}: consistent");

    Ok(())
}
