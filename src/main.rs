use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use fs_sim::command::Command;
use fs_sim::error::FsError;
use fs_sim::session::Session;

#[derive(Parser)]
struct Args {
    /// Command script, one command per line
    input_file: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let input_file = File::open(&args.input_file)
        .with_context(|| format!("Cannot open input file {}", args.input_file.display()))?;

    let mut session: Session = Session::new();
    let mut reader = BufReader::new(input_file);
    let mut line = Vec::new();

    for line_number in 1.. {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("reading {}", args.input_file.display()))?;
        if read == 0 {
            break;
        }

        let text = line.strip_suffix(b"\n").unwrap_or(&line[..]);
        match Command::parse_line(text) {
            Ok(None) => {}
            Ok(Some(command)) => {
                if let Err(err) = execute(&mut session, command) {
                    eprintln!("Error: {err}");
                }
            }
            Err(err) => {
                debug!("line {line_number}: {err}");
                eprintln!(
                    "Command Error: {}, {line_number}",
                    args.input_file.display()
                );
            }
        }
    }

    Ok(())
}

fn execute(session: &mut Session, command: Command) -> Result<(), FsError> {
    match command {
        Command::Mount(disk) => session.mount(&disk),
        Command::Create(name, size) => session.create(name, size),
        Command::Delete(name) => session.delete(name),
        Command::Read(name, n) => session.read(name, n),
        Command::Write(name, n) => session.write(name, n),
        Command::Buffer(bytes) => session.set_buffer(&bytes),
        Command::List => {
            let listing = session.list()?;
            listing
                .write_to(&mut io::stdout().lock())
                .context("writing listing")?;
            Ok(())
        }
        Command::Defragment => session.defragment(),
        Command::ChangeDirectory(name) => session.change_directory(name),
    }
}
