// Path: crates/types/src/account.rs
//! The account record owned by the account ledger.

use crate::address::Address;
use crate::coin::Coin;
use crate::error::TrxError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// One on-ledger account.
///
/// Accounts are long-lived entities owned by the account ledger and are
/// fetched and written back transaction by transaction; the execution
/// pipeline never caches them across transactions.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: Address,
    pub name: String,
    #[serde(with = "crate::json::u64_string")]
    pub nonce: u64,
    pub balance: Coin,
    /// Contract byte code, present only for contract accounts.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<Vec<u8>>,
    /// Document URL set by a set-doc transaction.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doc_url: Option<String>,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            name: String::new(),
            nonce: 0,
            balance: Coin::zero(),
            code: None,
            doc_url: None,
        }
    }

    pub fn with_balance(address: Address, balance: Coin) -> Self {
        let mut acct = Self::new(address);
        acct.balance = balance;
        acct
    }

    pub fn add_balance(&mut self, amt: &Coin) {
        self.balance = self.balance.checked_add(amt);
    }

    pub fn sub_balance(&mut self, amt: &Coin) -> Result<(), TrxError> {
        self.balance = self
            .balance
            .checked_sub(amt)
            .ok_or_else(|| TrxError::InsufficientFund {
                address: self.address,
                needed: amt.clone(),
                available: self.balance.clone(),
            })?;
        Ok(())
    }

    /// Balance check without mutation, used by the common validation pass.
    pub fn can_afford(&self, amt: &Coin) -> bool {
        self.balance.checked_sub(amt).is_some()
    }

    pub fn is_contract(&self) -> bool {
        self.code.is_some()
    }
}
