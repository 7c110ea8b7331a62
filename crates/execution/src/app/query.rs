// Path: crates/execution/src/app/query.rs
//! The generic query surface.
//!
//! Responses are JSON with the repository conventions: camelCase field
//! names, 64-bit integers as decimal strings.

use beatoz_api::app::{CommittedBlock, RequestQuery, ResponseQuery};
use beatoz_api::LedgerSet;
use beatoz_types::Address;
use serde_json::json;

const CODE_BAD_PATH: u32 = 1;
const CODE_BAD_DATA: u32 = 2;
const CODE_NOT_FOUND: u32 = 3;
const CODE_INTERNAL: u32 = 4;

pub(super) fn handle(
    ledgers: &LedgerSet,
    committed: &CommittedBlock,
    req: &RequestQuery,
) -> ResponseQuery {
    match req.path.as_str() {
        "account" => {
            let Some(addr) = Address::from_slice(&req.data) else {
                return ResponseQuery::error(CODE_BAD_DATA, "data must be a 20-byte address");
            };
            let Some(accounts) = ledgers.accounts() else {
                return ResponseQuery::error(CODE_INTERNAL, "account ledger unavailable");
            };
            match accounts.committed_account(&addr) {
                Some(acct) => to_json_response(&acct),
                None => ResponseQuery::error(CODE_NOT_FOUND, format!("no account {}", addr)),
            }
        }
        "gov/params" => match ledgers.gov_params() {
            Some(params) => to_json_response(&params),
            None => ResponseQuery::error(CODE_INTERNAL, "governance ledger unavailable"),
        },
        "staking/power" => {
            let Some(addr) = Address::from_slice(&req.data) else {
                return ResponseQuery::error(CODE_BAD_DATA, "data must be a 20-byte address");
            };
            let Some(staking) = ledgers.staking() else {
                return ResponseQuery::error(CODE_INTERNAL, "staking ledger unavailable");
            };
            to_json_response(&json!({
                "address": addr.to_string(),
                "power": staking.power_of(&addr).to_string(),
                "totalPower": staking.total_power().to_string(),
            }))
        }
        "supply" => {
            let Some(supply) = ledgers.supply() else {
                return ResponseQuery::error(CODE_INTERNAL, "supply ledger unavailable");
            };
            to_json_response(&json!({
                "totalSupply": supply.total_supply().to_string(),
            }))
        }
        "block/committed" => to_json_response(committed),
        other => ResponseQuery::error(CODE_BAD_PATH, format!("unknown query path '{}'", other)),
    }
}

fn to_json_response<T: serde::Serialize>(value: &T) -> ResponseQuery {
    match serde_json::to_vec(value) {
        Ok(raw) => ResponseQuery::ok(raw),
        Err(e) => ResponseQuery::error(CODE_INTERNAL, e.to_string()),
    }
}
