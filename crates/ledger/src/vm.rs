// Path: crates/ledger/src/vm.rs
//! The contract VM ledger.
//!
//! Contract-call transactions are the one type that manages the block gas
//! pool itself: the VM must meter sub-work (here, per input byte) and may
//! consume less than the declared gas limit, so the sequential executor
//! delegates both the reservation and the refund-on-failure to this
//! ledger instead of reserving the full limit up front.
//!
//! The execution core is deliberately small — deploys store code on a
//! derived contract account, calls store their input under its hash and
//! return the SHA-256 of `code || input` — but the gas, revert and
//! return-data behavior is the real contract the pipeline depends on.

use beatoz_api::{BlockContext, Lane, Ledger, TrxContext};
use beatoz_crypto::hash::{keccak256, sha256};
use beatoz_types::codec;
use beatoz_types::{Address, ChainError, Event, TrxError};
use beatoz_tx::TrxPayload;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

/// Base gas charged by every contract transaction.
pub const VM_BASE_GAS: u64 = 21_000;
/// Gas charged per input byte.
pub const VM_GAS_PER_BYTE: u64 = 16;

pub struct VmLedger {
    /// Per-contract storage: contract address -> key -> value.
    storage: RwLock<BTreeMap<Address, BTreeMap<Vec<u8>, Vec<u8>>>>,
    version: Mutex<u64>,
}

impl VmLedger {
    pub fn new() -> Self {
        Self {
            storage: RwLock::new(BTreeMap::new()),
            version: Mutex::new(0),
        }
    }

    /// The deterministic address of a contract deployed by `sender` at
    /// `nonce`.
    pub fn contract_address(sender: &Address, nonce: u64) -> Address {
        let mut preimage = Vec::with_capacity(28);
        preimage.extend_from_slice(sender.as_bytes());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let digest = keccak256(&preimage);
        Address::from_slice(&digest[12..]).unwrap_or(Address::ZERO)
    }

    pub fn storage_value(&self, contract: &Address, key: &[u8]) -> Option<Vec<u8>> {
        self.storage.read().get(contract)?.get(key).cloned()
    }

    fn state_hash(&self) -> [u8; 32] {
        sha256(codec::to_bytes_canonical(&*self.storage.read()))
    }

    /// Gas this call will consume, metered per input byte.
    fn gas_needed(data: &[u8]) -> u64 {
        VM_BASE_GAS + VM_GAS_PER_BYTE * data.len() as u64
    }
}

impl Default for VmLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for VmLedger {
    fn name(&self) -> &'static str {
        "vm"
    }

    fn validate_trx(&self, ctx: &TrxContext) -> Result<(), TrxError> {
        match &ctx.tx.payload {
            TrxPayload::ContractCall { data } => {
                if data.is_empty() {
                    return Err(TrxError::InvalidPayload("empty contract input".into()));
                }
                if !ctx.tx.to.is_zero() && !ctx.receiver.read().is_contract() {
                    return Err(TrxError::InvalidPayload(format!(
                        "target {} holds no contract code",
                        ctx.tx.to
                    )));
                }
                Ok(())
            }
            other => Err(TrxError::Ledger(format!(
                "vm ledger does not own type {}",
                other.tag()
            ))),
        }
    }

    fn execute_trx(&self, ctx: &mut TrxContext) -> Result<(), TrxError> {
        let TrxPayload::ContractCall { data } = ctx.tx.payload.clone() else {
            return Err(TrxError::Ledger(format!(
                "vm ledger does not own type {}",
                ctx.tx.payload.tag()
            )));
        };

        let gas = Self::gas_needed(&data);
        if gas > ctx.tx.gas {
            return Err(TrxError::Reverted {
                reason: format!("call needs {} gas, limit is {}", gas, ctx.tx.gas),
                return_data: Vec::new(),
            });
        }

        // The VM draws from the block pool itself; on any later failure it
        // must hand the reservation back.
        ctx.gas_pool.use_gas(gas)?;

        let result = self.run_call(ctx, &data);
        match result {
            Ok(()) => {
                ctx.gas_used = gas;
                Ok(())
            }
            Err(e) => {
                ctx.gas_pool.refund(gas);
                Err(e)
            }
        }
    }

    fn begin_block(&self, _bctx: &BlockContext) -> Result<Vec<Event>, ChainError> {
        Ok(Vec::new())
    }

    fn end_block(&self, _bctx: &BlockContext) -> Result<Vec<Event>, ChainError> {
        Ok(Vec::new())
    }

    fn commit(&self) -> Result<([u8; 32], u64), ChainError> {
        let mut version = self.version.lock();
        *version += 1;
        Ok((self.state_hash(), *version))
    }

    fn close(&self) -> Result<(), ChainError> {
        Ok(())
    }
}

impl VmLedger {
    fn run_call(&self, ctx: &mut TrxContext, data: &[u8]) -> Result<(), TrxError> {
        if ctx.tx.to.is_zero() {
            // Deploy: the input bytes become the contract code at an
            // address derived from (sender, nonce).
            let contract_addr = Self::contract_address(&ctx.tx.from, ctx.tx.nonce);
            let accounts = ctx
                .ledgers
                .accounts()
                .ok_or_else(|| TrxError::Ledger("account ledger unavailable".into()))?;
            let contract = accounts.find_or_new(&contract_addr, Lane::Exec);
            {
                let mut guard = contract.write();
                if guard.is_contract() {
                    return Err(TrxError::Reverted {
                        reason: format!("contract already deployed at {}", contract_addr),
                        return_data: contract_addr.as_bytes().to_vec(),
                    });
                }
                guard.code = Some(data.to_vec());
            }
            self.storage
                .write()
                .insert(contract_addr, BTreeMap::new());

            ctx.return_data = contract_addr.as_bytes().to_vec();
            ctx.emit(
                Event::new("contractDeploy")
                    .attr("address", contract_addr.to_string())
                    .attr("codeLen", data.len().to_string()),
            );
            Ok(())
        } else {
            let code = ctx
                .receiver
                .read()
                .code
                .clone()
                .ok_or_else(|| TrxError::Reverted {
                    reason: format!("no code at {}", ctx.tx.to),
                    return_data: Vec::new(),
                })?;

            let output = sha256([code.as_slice(), data].concat());
            self.storage
                .write()
                .entry(ctx.tx.to)
                .or_default()
                .insert(sha256(data).to_vec(), data.to_vec());

            ctx.return_data = output.to_vec();
            ctx.emit(
                Event::new("contractCall")
                    .attr("address", ctx.tx.to.to_string())
                    .attr("inputLen", data.len().to_string()),
            );
            Ok(())
        }
    }
}
