//! The token ledger state machine.
//!
//! A [`TokenLedger`] composes three orthogonal facets over one balance
//! store: a transferable (and renounceable) owner slot, a minter policy,
//! and a pause gate that blocks every balance-mutating operation while
//! leaving reads and administrative calls untouched.
//!
//! Every mutating operation validates all of its preconditions before
//! touching any field, then applies the full update and appends the
//! matching [`LedgerEvent`] to the journal. A rejected call leaves no
//! partial state behind.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::{LedgerError, LedgerResult};
use crate::roles::{MinterPolicy, Ownership};

pub type Amount = u64;

/// Notification emitted by a committed ledger operation.
///
/// `Transfer` with `from: None` records an issuance (mint); `to: None`
/// records a burn.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Transfer {
        from: Option<Address>,
        to: Option<Address>,
        amount: Amount,
    },
    Approval {
        holder: Address,
        spender: Address,
        amount: Amount,
    },
    OwnershipTransferred {
        previous: Option<Address>,
        new: Option<Address>,
    },
    MinterChanged {
        previous: Address,
        new: Address,
    },
    MinterAdded {
        addr: Address,
    },
    MinterRemoved {
        addr: Address,
    },
    Paused,
    Unpaused,
}

/// Serializable point-in-time view of the committed ledger state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub owner: Option<Address>,
    pub paused: bool,
    pub total_supply: Amount,
    pub balances: BTreeMap<Address, Amount>,
    pub events: Vec<LedgerEvent>,
    pub state_root: [u8; 32],
}

/// The root aggregate: balances, supply, roles, pause flag, and the
/// event journal. One instance per deployment; there is no teardown path.
pub struct TokenLedger {
    name: String,
    symbol: String,
    decimals: u8,
    ownership: Ownership,
    minters: MinterPolicy,
    paused: bool,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
    total_supply: Amount,
    events: Vec<LedgerEvent>,
}

impl TokenLedger {
    /// Creates a ledger with the set minter model: the owner is implicitly
    /// authorized to mint and the set starts empty.
    ///
    /// The initial supply is minted to `receiver`, falling back to the
    /// deployer when no receiver is given. A zero initial supply still
    /// records the issuance event.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        initial_supply: Amount,
        receiver: Option<Address>,
        deployer: Address,
    ) -> Self {
        let receiver = receiver.unwrap_or(deployer);
        Self::construct(
            name.into(),
            symbol.into(),
            decimals,
            initial_supply,
            receiver,
            deployer,
            MinterPolicy::empty_set(),
        )
    }

    /// Creates a ledger with the single-minter model: exactly one
    /// designated minter, and the owner has no implicit mint right.
    ///
    /// The initial supply is minted to the minter, which falls back to
    /// the deployer when no minter is given.
    pub fn with_minter(
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        initial_supply: Amount,
        minter: Option<Address>,
        deployer: Address,
    ) -> Self {
        let minter = minter.unwrap_or(deployer);
        Self::construct(
            name.into(),
            symbol.into(),
            decimals,
            initial_supply,
            minter,
            deployer,
            MinterPolicy::single(minter),
        )
    }

    fn construct(
        name: String,
        symbol: String,
        decimals: u8,
        initial_supply: Amount,
        receiver: Address,
        deployer: Address,
        minters: MinterPolicy,
    ) -> Self {
        let mut ledger = Self {
            name,
            symbol,
            decimals,
            ownership: Ownership::new(deployer),
            minters,
            paused: false,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            total_supply: initial_supply,
            events: Vec::new(),
        };
        ledger.balances.insert(receiver, initial_supply);
        ledger.events.push(LedgerEvent::Transfer {
            from: None,
            to: Some(receiver),
            amount: initial_supply,
        });
        ledger
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, holder: &Address, spender: &Address) -> Amount {
        self.allowances.get(&(*holder, *spender)).copied().unwrap_or(0)
    }

    pub fn owner(&self) -> Option<Address> {
        self.ownership.current()
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// The designated minter, when the single model is configured.
    pub fn minter(&self) -> Option<Address> {
        self.minters.designated()
    }

    /// Literal role membership, independent of the implicit owner right.
    pub fn is_minter(&self, addr: &Address) -> bool {
        self.minters.is_member(addr)
    }

    /// Filters `candidates` down to reported minters. Under the set model
    /// the owner is reported as an honorary member; the authorization
    /// check for minting does not depend on this listing.
    pub fn list_minters(&self, candidates: &[Address]) -> Vec<Address> {
        self.minters
            .filter_members(candidates, self.ownership.current().as_ref())
            .into_iter()
            .copied()
            .collect()
    }

    /// The journal of notifications emitted so far, in commit order.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    // ------------------------------------------------------------------
    // Ownership facet
    // ------------------------------------------------------------------

    /// Hands the owner slot to `new_owner`. Owner-gated. The parameter is
    /// a concrete `Address`, so handing ownership to the null sentinel is
    /// unrepresentable; clearing the slot goes through
    /// [`Self::renounce_ownership`].
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> LedgerResult<()> {
        let previous = self.ownership.transfer(caller, new_owner)?;
        debug!("ownership transferred: {previous} -> {new_owner}");
        self.events.push(LedgerEvent::OwnershipTransferred {
            previous: Some(previous),
            new: Some(new_owner),
        });
        Ok(())
    }

    /// Permanently clears the owner slot. Terminal: every owner-gated
    /// operation fails from here on, for every caller.
    pub fn renounce_ownership(&mut self, caller: &Address) -> LedgerResult<()> {
        let previous = self.ownership.renounce(caller)?;
        debug!("ownership renounced by {previous}");
        self.events.push(LedgerEvent::OwnershipTransferred {
            previous: Some(previous),
            new: None,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Minter facet
    // ------------------------------------------------------------------

    /// Replaces the designated minter (single model only). Owner-gated.
    pub fn set_minter(&mut self, caller: &Address, new_minter: Address) -> LedgerResult<()> {
        self.ownership.ensure(caller)?;
        let previous = self.minters.replace(new_minter)?;
        debug!("minter changed: {previous} -> {new_minter}");
        self.events.push(LedgerEvent::MinterChanged {
            previous,
            new: new_minter,
        });
        Ok(())
    }

    /// Adds `addr` to the minter set (set model only). Owner-gated.
    /// Returns `false` without an event when the address was already a
    /// member.
    pub fn add_minter(&mut self, caller: &Address, addr: Address) -> LedgerResult<bool> {
        self.ownership.ensure(caller)?;
        let inserted = self.minters.insert(addr)?;
        if inserted {
            debug!("minter added: {addr}");
            self.events.push(LedgerEvent::MinterAdded { addr });
        }
        Ok(inserted)
    }

    /// Removes `addr` from the minter set (set model only). Owner-gated.
    /// Removing a non-member is a safe no-op returning `false`.
    pub fn remove_minter(&mut self, caller: &Address, addr: Address) -> LedgerResult<bool> {
        self.ownership.ensure(caller)?;
        let removed = self.minters.remove(&addr)?;
        if removed {
            debug!("minter removed: {addr}");
            self.events.push(LedgerEvent::MinterRemoved { addr });
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Pause facet
    // ------------------------------------------------------------------

    /// Closes the gate. Owner-gated, strict: fails when already paused.
    pub fn pause(&mut self, caller: &Address) -> LedgerResult<()> {
        self.ownership.ensure(caller)?;
        if self.paused {
            return Err(LedgerError::AlreadyPaused);
        }
        self.paused = true;
        debug!("ledger paused");
        self.events.push(LedgerEvent::Paused);
        Ok(())
    }

    /// Reopens the gate. Owner-gated, strict: fails when not paused.
    pub fn unpause(&mut self, caller: &Address) -> LedgerResult<()> {
        self.ownership.ensure(caller)?;
        if !self.paused {
            return Err(LedgerError::NotPaused);
        }
        self.paused = false;
        debug!("ledger unpaused");
        self.events.push(LedgerEvent::Unpaused);
        Ok(())
    }

    fn ensure_not_paused(&self) -> LedgerResult<()> {
        if self.paused {
            return Err(LedgerError::Paused);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Supply control
    // ------------------------------------------------------------------

    /// Creates `amount` new units for `to`. Gate must be open and the
    /// caller must pass the configured minter policy. A zero amount is a
    /// permitted no-op that still records the issuance event.
    pub fn mint(&mut self, caller: &Address, to: Address, amount: Amount) -> LedgerResult<()> {
        self.ensure_not_paused()?;
        if !self
            .minters
            .authorizes(caller, self.ownership.current().as_ref())
        {
            return Err(LedgerError::NotAuthorizedToMint {
                caller: *caller,
                reason: self.minters.denial_reason(),
            });
        }
        let new_balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.balances.insert(to, new_balance);
        self.total_supply = new_supply;
        debug!("minted {amount} to {to}, supply now {new_supply}");
        self.events.push(LedgerEvent::Transfer {
            from: None,
            to: Some(to),
            amount,
        });
        Ok(())
    }

    /// Destroys `amount` units from the caller's own balance.
    pub fn burn(&mut self, caller: &Address, amount: Amount) -> LedgerResult<()> {
        self.ensure_not_paused()?;
        let new_balance = self.debit_amount(caller, amount)?;

        self.balances.insert(*caller, new_balance);
        self.total_supply -= amount;
        debug!("burned {amount} from {caller}, supply now {}", self.total_supply);
        self.events.push(LedgerEvent::Transfer {
            from: Some(*caller),
            to: None,
            amount,
        });
        Ok(())
    }

    /// Destroys `amount` units from `holder`'s balance using the
    /// allowance `holder` granted to the caller. The allowance is checked
    /// before the balance; allowance, balance, and supply move together.
    pub fn burn_from(
        &mut self,
        caller: &Address,
        holder: &Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.ensure_not_paused()?;
        let new_allowance = self.debit_allowance(holder, caller, amount)?;
        let new_balance = self.debit_amount(holder, amount)?;

        self.allowances.insert((*holder, *caller), new_allowance);
        self.balances.insert(*holder, new_balance);
        self.total_supply -= amount;
        debug!("burned {amount} from {holder} via {caller}");
        self.events.push(LedgerEvent::Transfer {
            from: Some(*holder),
            to: None,
            amount,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transfers and allowances
    // ------------------------------------------------------------------

    /// Moves `amount` from the caller to `to`. Supply is untouched. A
    /// zero amount is a permitted no-op that still records the event.
    pub fn transfer(&mut self, caller: &Address, to: Address, amount: Amount) -> LedgerResult<()> {
        self.ensure_not_paused()?;
        let new_from = self.debit_amount(caller, amount)?;
        let new_to = if to == *caller {
            new_from
        } else {
            self.balance_of(&to)
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?
        };

        self.balances.insert(*caller, new_from);
        self.balances.insert(to, new_to);
        self.events.push(LedgerEvent::Transfer {
            from: Some(*caller),
            to: Some(to),
            amount,
        });
        Ok(())
    }

    /// Grants `spender` the right to move or burn up to `amount` of the
    /// caller's balance. Not a balance mutation, so not pause-gated.
    pub fn approve(
        &mut self,
        caller: &Address,
        spender: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.allowances.insert((*caller, spender), amount);
        self.events.push(LedgerEvent::Approval {
            holder: *caller,
            spender,
            amount,
        });
        Ok(())
    }

    /// Moves `amount` from `from` to `to` on the strength of the caller's
    /// allowance.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.ensure_not_paused()?;
        let new_allowance = self.debit_allowance(from, caller, amount)?;
        let new_from = self.debit_amount(from, amount)?;
        let new_to = if to == *from {
            new_from
        } else {
            self.balance_of(&to)
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?
        };

        self.allowances.insert((*from, *caller), new_allowance);
        self.balances.insert(*from, new_from);
        self.balances.insert(to, new_to);
        self.events.push(LedgerEvent::Transfer {
            from: Some(*from),
            to: Some(to),
            amount,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Validates that `account` can afford `amount` and returns the
    /// balance it would be left with. Does not mutate.
    fn debit_amount(&self, account: &Address, amount: Amount) -> LedgerResult<Amount> {
        let have = self.balance_of(account);
        have.checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: *account,
                have,
                need: amount,
            })
    }

    /// Validates the allowance `holder` granted `spender` against
    /// `amount` and returns the remainder. Does not mutate.
    fn debit_allowance(
        &self,
        holder: &Address,
        spender: &Address,
        amount: Amount,
    ) -> LedgerResult<Amount> {
        let have = self.allowance(holder, spender);
        have.checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance {
                spender: *spender,
                have,
                need: amount,
            })
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Point-in-time view of the committed state, with a deterministic
    /// merkle root over the balance entries and a supply/pause/owner
    /// header leaf.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            owner: self.ownership.current(),
            paused: self.paused,
            total_supply: self.total_supply,
            balances: self.balances.clone(),
            events: self.events.clone(),
            state_root: self.state_root(),
        }
    }

    fn state_root(&self) -> [u8; 32] {
        let mut leaves: Vec<[u8; 32]> = Vec::with_capacity(self.balances.len() + 1);

        let mut header = Sha256::new();
        header.update(b"head");
        header.update(self.total_supply.to_le_bytes());
        header.update([self.paused as u8, self.decimals]);
        match self.ownership.current() {
            Some(owner) => header.update(owner.as_bytes()),
            None => header.update([0u8; 1]),
        }
        leaves.push(header.finalize().into());

        for (account, amount) in &self.balances {
            let mut hasher = Sha256::new();
            hasher.update(b"acct");
            hasher.update(account.as_bytes());
            hasher.update(amount.to_le_bytes());
            leaves.push(hasher.finalize().into());
        }
        build_merkle(leaves)
    }
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"token-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            if chunk.len() == 2 {
                hasher.update(chunk[1]);
            } else {
                hasher.update(chunk[0]);
            }
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
