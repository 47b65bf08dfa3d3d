use thiserror::Error;

use crate::address::Address;
use crate::ledger::Amount;

/// Error during a ledger operation.
///
/// Every error is a synchronous rejection: the attempted operation leaves
/// no partial state change behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("caller {caller} is not the owner")]
    Unauthorized { caller: Address },

    #[error("{reason}")]
    NotAuthorizedToMint { caller: Address, reason: &'static str },

    #[error("operation requires a concrete address")]
    InvalidAddress,

    #[error("contract is paused")]
    Paused,

    #[error("contract is already paused")]
    AlreadyPaused,

    #[error("contract is not paused")]
    NotPaused,

    #[error("insufficient balance in {account}: have {have}, need {need}")]
    InsufficientBalance {
        account: Address,
        have: Amount,
        need: Amount,
    },

    #[error("insufficient allowance for spender {spender}: have {have}, need {need}")]
    InsufficientAllowance {
        spender: Address,
        have: Amount,
        need: Amount,
    },

    #[error("operation not supported by the configured minter model")]
    WrongMinterModel,

    #[error("arithmetic overflow")]
    Overflow,
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
