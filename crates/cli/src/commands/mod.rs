//! CLI command implementations.

pub mod accounts;
pub mod catalog;
pub mod secret;

use shekels_core::AccountId;
use shekels_server::store::StoreError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Reading or writing a data file failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No account has this id.
    #[error("No account with id {0}")]
    UnknownAccount(AccountId),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
