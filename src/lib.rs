pub mod allocator;
pub mod command;
pub mod consistency;
mod defrag;
pub mod disk_format;
pub mod error;
pub mod filesystem;
pub mod session;
pub mod storage;
