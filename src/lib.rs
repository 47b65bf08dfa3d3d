//! Permissioned fungible-token ledger.
//!
//! An account-balance store with owner-controlled administrative roles:
//! minting rights, a pause switch, and transferable (or renounceable)
//! ownership. The crate is the permission and supply-control layer only;
//! transaction submission, key management, and deployment tooling live
//! with the hosting environment.
//!
//! # Key Types
//!
//! - [`TokenLedger`]: the root aggregate (balances, supply, roles, events)
//! - [`MinterPolicy`]: single-minter or minter-set authorization model
//! - [`LedgerEvent`]: notifications emitted by committed operations
//! - [`LedgerError`]: the rejection taxonomy; no error corrupts state
//!
//! # Example
//!
//! ```
//! use token_ledger::{Address, TokenLedger};
//!
//! let owner = Address::new([1; 20]);
//! let alice = Address::new([2; 20]);
//!
//! let mut ledger = TokenLedger::new("Token Test", "TEST", 6, 1_000_000, None, owner);
//! ledger.mint(&owner, alice, 500).unwrap();
//! assert_eq!(ledger.balance_of(&alice), 500);
//! assert_eq!(ledger.total_supply(), 1_000_500);
//! ```

pub mod address;
pub mod error;
pub mod ledger;
pub mod roles;

pub use address::{Address, AddressParseError, ADDRESS_LEN};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{Amount, LedgerEvent, LedgerSnapshot, TokenLedger};
pub use roles::{MinterPolicy, Ownership};
