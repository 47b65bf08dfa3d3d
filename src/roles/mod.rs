//! Role state for the ledger: the ownership facet and the minter facet.
//!
//! Ownership is a single transferable administrator slot that can be
//! permanently cleared. Minting rights come in two models selected at
//! construction: a single designated minter, or a set of minters with the
//! owner implicitly authorized.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{LedgerError, LedgerResult};

/// The single administrator slot.
///
/// `None` means ownership has been renounced: no caller can ever satisfy
/// an owner check again.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ownership {
    owner: Option<Address>,
}

impl Ownership {
    pub fn new(owner: Address) -> Self {
        Self { owner: Some(owner) }
    }

    pub fn current(&self) -> Option<Address> {
        self.owner
    }

    /// Fails unless `caller` is the current owner. Always fails after
    /// renouncement.
    pub fn ensure(&self, caller: &Address) -> LedgerResult<()> {
        match &self.owner {
            Some(owner) if owner == caller => Ok(()),
            _ => Err(LedgerError::Unauthorized { caller: *caller }),
        }
    }

    /// Replaces the owner, returning the previous one for the notification.
    pub fn transfer(&mut self, caller: &Address, new_owner: Address) -> LedgerResult<Address> {
        match self.owner {
            Some(owner) if owner == *caller => {
                self.owner = Some(new_owner);
                Ok(owner)
            }
            _ => Err(LedgerError::Unauthorized { caller: *caller }),
        }
    }

    /// Clears the owner slot. Terminal: there is no path back.
    pub fn renounce(&mut self, caller: &Address) -> LedgerResult<Address> {
        match self.owner.take() {
            Some(owner) if owner == *caller => Ok(owner),
            other => {
                self.owner = other;
                Err(LedgerError::Unauthorized { caller: *caller })
            }
        }
    }
}

const DENIAL_SINGLE: &str = "Only minter can perform this action";
const DENIAL_SET: &str = "Only minter or owner can perform this action";

/// Authorization policy for minting.
///
/// The two variants are alternative designs of the same capability; mint
/// and burn logic only consults [`MinterPolicy::authorizes`] and stays
/// untouched whichever model is configured.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum MinterPolicy {
    /// One designated minter. The owner has no implicit mint right.
    Single { minter: Address },
    /// A set of minters; the owner is implicitly authorized and is never
    /// stored in the set.
    Set { minters: BTreeSet<Address> },
}

impl MinterPolicy {
    pub fn single(minter: Address) -> Self {
        Self::Single { minter }
    }

    pub fn empty_set() -> Self {
        Self::Set {
            minters: BTreeSet::new(),
        }
    }

    /// The mint-authorization predicate.
    pub fn authorizes(&self, caller: &Address, owner: Option<&Address>) -> bool {
        match self {
            Self::Single { minter } => caller == minter,
            Self::Set { minters } => owner == Some(caller) || minters.contains(caller),
        }
    }

    /// Human-readable reason attached to a denied mint.
    pub fn denial_reason(&self) -> &'static str {
        match self {
            Self::Single { .. } => DENIAL_SINGLE,
            Self::Set { .. } => DENIAL_SET,
        }
    }

    /// Replaces the designated minter, returning the previous one.
    /// Set-model ledgers reject this with `WrongMinterModel`.
    pub fn replace(&mut self, new_minter: Address) -> LedgerResult<Address> {
        match self {
            Self::Single { minter } => Ok(std::mem::replace(minter, new_minter)),
            Self::Set { .. } => Err(LedgerError::WrongMinterModel),
        }
    }

    /// Inserts into the minter set. Returns `false` when the address was
    /// already a member (strict no-op). Single-model ledgers reject.
    pub fn insert(&mut self, addr: Address) -> LedgerResult<bool> {
        match self {
            Self::Set { minters } => Ok(minters.insert(addr)),
            Self::Single { .. } => Err(LedgerError::WrongMinterModel),
        }
    }

    /// Removes from the minter set. Removing a non-member returns `false`
    /// and changes nothing.
    pub fn remove(&mut self, addr: &Address) -> LedgerResult<bool> {
        match self {
            Self::Set { minters } => Ok(minters.remove(addr)),
            Self::Single { .. } => Err(LedgerError::WrongMinterModel),
        }
    }

    /// Literal set membership, or equality with the designated minter.
    /// Does not treat the owner as a member; use [`Self::authorizes`] for
    /// the authorization decision.
    pub fn is_member(&self, addr: &Address) -> bool {
        match self {
            Self::Single { minter } => minter == addr,
            Self::Set { minters } => minters.contains(addr),
        }
    }

    /// The designated minter, when the single model is configured.
    pub fn designated(&self) -> Option<Address> {
        match self {
            Self::Single { minter } => Some(*minter),
            Self::Set { .. } => None,
        }
    }

    /// Filters `candidates` down to those the listing reports as minters.
    /// The owner is reported as an honorary member of the set model even
    /// though it is never a literal entry.
    pub fn filter_members<'a>(
        &self,
        candidates: &'a [Address],
        owner: Option<&Address>,
    ) -> Vec<&'a Address> {
        candidates
            .iter()
            .filter(|&c| {
                self.is_member(c) || (matches!(self, Self::Set { .. }) && owner == Some(c))
            })
            .collect()
    }
}
