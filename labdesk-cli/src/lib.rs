//! `labdesk` command line: the front-desk and admin screens as subcommands.

pub mod cli;
pub mod commands;
pub mod output;
pub mod session_store;

pub use cli::Cli;
pub use commands::{App, Reported};
pub use session_store::FileSessionStore;
