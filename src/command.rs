//! Parsing of command-script lines.
//!
//! Every line holds one command: a letter followed by its arguments. Lines are raw bytes, since
//! `B` copies whatever follows it into the buffer. The parser only produces well-formed commands;
//! whether they succeed is up to the [`Session`](crate::session::Session).

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use thiserror::Error;

use crate::disk_format::{block::BLOCK_SIZE, inode::InodeName};

/// The largest file that can be created, in blocks.
pub const MAX_CREATE_SIZE: usize = 127;

/// The largest block index accepted by `R` and `W`.
pub const MAX_BLOCK_INDEX: usize = 126;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `M <disk>`
    Mount(PathBuf),
    /// `C <name> <size>`
    Create(InodeName, usize),
    /// `D <name>`
    Delete(InodeName),
    /// `R <name> <block>`
    Read(InodeName, usize),
    /// `W <name> <block>`
    Write(InodeName, usize),
    /// `B <bytes>`
    Buffer(Vec<u8>),
    /// `L`
    List,
    /// `O`
    Defragment,
    /// `Y <name>`
    ChangeDirectory(InodeName),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{}'", .0.escape_ascii())]
    UnknownCommand(u8),
    #[error("expected {expected} argument(s), found {found}")]
    WrongArity { expected: usize, found: usize },
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("{value} is out of range 0-{max}")]
    OutOfRange { value: i64, max: usize },
    #[error("buffer contents are empty")]
    EmptyBuffer,
    #[error("buffer contents are {0} bytes long")]
    BufferTooLong(usize),
}

impl Command {
    /// Parses one line, without its trailing newline. Returns `Ok(None)` for blank lines.
    pub fn parse_line(line: &[u8]) -> Result<Option<Command>, CommandError> {
        let line = trim_start(line);
        let Some((&letter, rest)) = line.split_first() else {
            return Ok(None);
        };

        let args = trim_start(rest);

        let command = match letter {
            b'M' => {
                let [disk] = tokens::<1>(args)?;
                Command::Mount(PathBuf::from(OsStr::from_bytes(disk)))
            }
            b'C' => {
                let [name, size] = tokens::<2>(args)?;
                Command::Create(parse_name(name)?, parse_number(size, MAX_CREATE_SIZE)?)
            }
            b'D' => {
                let [name] = tokens::<1>(args)?;
                Command::Delete(parse_name(name)?)
            }
            b'R' => {
                let [name, block] = tokens::<2>(args)?;
                Command::Read(parse_name(name)?, parse_number(block, MAX_BLOCK_INDEX)?)
            }
            b'W' => {
                let [name, block] = tokens::<2>(args)?;
                Command::Write(parse_name(name)?, parse_number(block, MAX_BLOCK_INDEX)?)
            }
            b'B' => {
                if args.is_empty() {
                    return Err(CommandError::EmptyBuffer);
                }
                if args.len() > BLOCK_SIZE {
                    return Err(CommandError::BufferTooLong(args.len()));
                }
                Command::Buffer(args.to_vec())
            }
            b'L' => {
                tokens::<0>(args)?;
                Command::List
            }
            b'O' => {
                tokens::<0>(args)?;
                Command::Defragment
            }
            b'Y' => {
                let [name] = tokens::<1>(args)?;
                Command::ChangeDirectory(parse_name(name)?)
            }
            other => return Err(CommandError::UnknownCommand(other)),
        };

        Ok(Some(command))
    }
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Splits `args` into exactly `N` whitespace-separated tokens.
fn tokens<const N: usize>(args: &[u8]) -> Result<[&[u8]; N], CommandError> {
    let tokens: Vec<_> = args
        .split(u8::is_ascii_whitespace)
        .filter(|token| !token.is_empty())
        .collect();
    let found = tokens.len();

    tokens
        .try_into()
        .map_err(|_| CommandError::WrongArity { expected: N, found })
}

fn parse_name(name: &[u8]) -> Result<InodeName, CommandError> {
    InodeName::try_from(name)
        .map_err(|_| CommandError::InvalidName(String::from_utf8_lossy(name).into_owned()))
}

fn parse_number(value: &[u8], max: usize) -> Result<usize, CommandError> {
    let number: i64 = std::str::from_utf8(value)
        .ok()
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| CommandError::InvalidNumber(String::from_utf8_lossy(value).into_owned()))?;

    usize::try_from(number)
        .ok()
        .filter(|&n| n <= max)
        .ok_or(CommandError::OutOfRange { value: number, max })
}
