// Path: crates/execution/src/exec.rs
//! The sequential executor.
//!
//! The only place where ledger-mutating side effects for transactions
//! happen. It consumes prepared contexts strictly in original submission
//! order on a single thread: common validation, then the owning ledger's
//! type-specific validation and execution, then the type-agnostic
//! post-processing that charges the fee and bumps the nonce. A failure at
//! any step aborts only that transaction — its gas reservation is handed
//! back to the block pool — and never the block.

use beatoz_api::{BlockContext, Ledger, TrxContext};
use beatoz_tx::TrxPayload;
use beatoz_types::{Coin, TrxError};
use std::sync::Arc;

/// The ledger sub-system owning a payload type. The type set is closed,
/// so this is a plain match, not open-ended dispatch.
pub fn owning_ledger<'a>(bctx: &'a BlockContext, payload: &TrxPayload) -> &'a Arc<dyn Ledger> {
    match payload {
        TrxPayload::Transfer | TrxPayload::SetDoc { .. } => &bctx.ledgers.account,
        TrxPayload::Stake | TrxPayload::Unstake { .. } => &bctx.ledgers.staking,
        TrxPayload::ProposalSubmit { .. } | TrxPayload::ProposalVote { .. } => &bctx.ledgers.gov,
        TrxPayload::ContractCall { .. } => &bctx.ledgers.vm,
        TrxPayload::Withdraw { .. } => &bctx.ledgers.supply,
    }
}

/// True for the types whose envelope amount is debited from the sender's
/// spendable balance. Every other type must leave the amount at zero;
/// its quantities travel in the payload.
pub fn moves_envelope_amount(payload: &TrxPayload) -> bool {
    matches!(payload, TrxPayload::Transfer | TrxPayload::Stake)
}

/// Cross-account checks that can only run against current — possibly
/// just-mutated-by-a-prior-transaction — state: the nonce must equal the
/// expected value exactly, and balances must cover the worst-case fee
/// plus the moved amount.
pub fn validate_trx(ctx: &TrxContext) -> Result<(), TrxError> {
    let expected_nonce = ctx.sender.read().nonce;
    if ctx.tx.nonce != expected_nonce {
        return Err(TrxError::InvalidNonce {
            expected: expected_nonce,
            got: ctx.tx.nonce,
        });
    }

    if !moves_envelope_amount(&ctx.tx.payload) && !ctx.tx.amount.is_zero() {
        return Err(TrxError::InvalidPayload(format!(
            "type {} does not move the envelope amount",
            ctx.tx.payload.tag()
        )));
    }

    let max_fee = ctx.tx.gas_price.mul_u64(ctx.tx.gas);
    match &ctx.payer {
        Some(payer) => {
            // Distinct payer: it covers the fee, the sender covers the
            // amount.
            {
                let guard = payer.read();
                if !guard.can_afford(&max_fee) {
                    return Err(TrxError::InsufficientFund {
                        address: guard.address,
                        needed: max_fee,
                        available: guard.balance.clone(),
                    });
                }
            }
            let guard = ctx.sender.read();
            if !guard.can_afford(&ctx.tx.amount) {
                return Err(TrxError::InsufficientFund {
                    address: guard.address,
                    needed: ctx.tx.amount.clone(),
                    available: guard.balance.clone(),
                });
            }
        }
        None => {
            let needed = ctx.tx.amount.checked_add(&max_fee);
            let guard = ctx.sender.read();
            if !guard.can_afford(&needed) {
                return Err(TrxError::InsufficientFund {
                    address: guard.address,
                    needed,
                    available: guard.balance.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Runs the owning ledger's state transition with uniform gas handling.
///
/// Non-VM types reserve the declared gas limit from the block pool up
/// front and consume it flat; the reservation is refunded if execution
/// fails. Contract-VM transactions manage the pool themselves because the
/// VM meters sub-work.
pub fn execute_trx(ctx: &mut TrxContext, bctx: &BlockContext) -> Result<(), TrxError> {
    let vm_managed = matches!(ctx.tx.payload, TrxPayload::ContractCall { .. });
    let ledger = owning_ledger(bctx, &ctx.tx.payload).clone();

    if !vm_managed {
        ctx.gas_pool.use_gas(ctx.tx.gas)?;
    }

    match ledger.execute_trx(ctx) {
        Ok(()) => {
            if !vm_managed {
                ctx.gas_used = ctx.tx.gas;
            }
            Ok(())
        }
        Err(e) => {
            if !vm_managed {
                ctx.gas_pool.refund(ctx.tx.gas);
            }
            Err(e)
        }
    }
}

/// Type-agnostic post-processing, run exactly once per successfully
/// executed transaction: fee = gas used x gas price, debited from the fee
/// payer; sender nonce incremented; both accounts written back through
/// the account ledger.
pub fn post_run(ctx: &mut TrxContext, bctx: &BlockContext) -> Result<Coin, TrxError> {
    let fee = ctx.tx.gas_price.mul_u64(ctx.gas_used);

    let payer = ctx.fee_payer();
    payer.write().sub_balance(&fee)?;
    ctx.sender.write().nonce += 1;

    if let Some(accounts) = bctx.ledgers.accounts() {
        accounts.set_account(&ctx.sender, ctx.lane);
        accounts.set_account(&ctx.receiver, ctx.lane);
        if let Some(p) = &ctx.payer {
            accounts.set_account(p, ctx.lane);
        }
    }

    bctx.add_fee(&fee);
    Ok(fee)
}

/// Validate → type-specific validate → execute → post-process, with the
/// symmetric gas refund on any failure after the reservation.
pub fn run_trx(ctx: &mut TrxContext, bctx: &BlockContext) -> Result<Coin, TrxError> {
    validate_trx(ctx)?;
    owning_ledger(bctx, &ctx.tx.payload)
        .clone()
        .validate_trx(ctx)?;
    execute_trx(ctx, bctx)?;
    match post_run(ctx, bctx) {
        Ok(fee) => Ok(fee),
        Err(e) => {
            // Validation guaranteed the fee is affordable, so this only
            // fires on a ledger bug; hand the gas back regardless.
            ctx.gas_pool.refund(ctx.gas_used);
            Err(e)
        }
    }
}
