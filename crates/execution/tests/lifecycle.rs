// Path: crates/execution/tests/lifecycle.rs
//! Block-lifecycle scenarios driven through the public `BeatozApp`
//! surface, the way the consensus engine drives it.

use beatoz_api::app::{BlockHeader, CheckKind, RequestQuery, ResponseCommit, ResponseEndBlock};
use beatoz_crypto::PrivateKey;
use beatoz_execution::BeatozApp;
use beatoz_ledger::MemMetaStore;
use beatoz_tx::{sign, SignRole, SignerVariant, Trx, TrxPayload};
use beatoz_types::genesis::{GenesisAppState, GenesisHolder, GenesisValidator};
use beatoz_types::{Account, Address, Coin, GovParams};
use rand::rngs::OsRng;
use std::sync::Arc;

const CHAIN: &str = "beatoz-testnet-1";
const BLOCK_TIME: i64 = 1_700_000_000_000_000_000;

fn test_params() -> GovParams {
    GovParams {
        gas_price: Coin::from_u64(10),
        min_trx_gas: 10,
        max_trx_gas: 10_000_000,
        block_gas_limit: 10_000_000,
        min_block_gas_limit: 1_000,
        max_block_gas_limit: 100_000_000,
        max_total_supply: Coin::from_u64(u64::MAX),
        block_reward: Coin::from_u64(500),
        voting_blocks: 100,
        min_validator_stake: Coin::from_u64(1_000_000_000),
        unbonding_blocks: 2,
        slash_ratio_bps: 5_000,
    }
}

struct Chain {
    app: BeatozApp,
    keys: Vec<PrivateKey>,
    height: u64,
}

impl Chain {
    /// Three funded accounts; the first doubles as a genesis validator
    /// with 5 units of power.
    fn start() -> Self {
        let keys: Vec<PrivateKey> = (0..3).map(|_| PrivateKey::generate(&mut OsRng)).collect();
        let genesis = GenesisAppState {
            holders: keys
                .iter()
                .map(|k| GenesisHolder {
                    address: k.address(),
                    balance: Coin::from_u64(1_000_000_000),
                    name: String::new(),
                })
                .collect(),
            validators: vec![GenesisValidator {
                address: keys[0].address(),
                stake: Coin::from_u64(5_000_000_000),
            }],
            params: test_params(),
        };

        let app = BeatozApp::new(CHAIN, Arc::new(MemMetaStore::new()), 4).unwrap();
        app.init_chain(&genesis).unwrap();
        Self {
            app,
            keys,
            height: 0,
        }
    }

    fn proposer(&self) -> Address {
        self.keys[0].address()
    }

    fn run_block(&mut self, txs: Vec<Vec<u8>>) -> (ResponseEndBlock, ResponseCommit) {
        self.run_block_with_byzantine(txs, Vec::new())
    }

    fn run_block_with_byzantine(
        &mut self,
        txs: Vec<Vec<u8>>,
        byzantine: Vec<Address>,
    ) -> (ResponseEndBlock, ResponseCommit) {
        self.height += 1;
        let header = BlockHeader {
            height: self.height,
            time: BLOCK_TIME + self.height as i64,
            chain_id: CHAIN.into(),
            proposer: self.proposer(),
            byzantine,
        };
        self.app.begin_block(&header).unwrap();
        for raw in txs {
            self.app.deliver_trx(raw).unwrap();
        }
        let end = self.app.end_block().unwrap();
        let commit = self.app.commit().unwrap();
        (end, commit)
    }

    fn account(&self, addr: &Address) -> Account {
        let res = self.app.query(&RequestQuery {
            path: "account".into(),
            data: addr.as_bytes().to_vec(),
        });
        assert_eq!(res.code, 0, "account query failed: {}", res.log);
        serde_json::from_slice(&res.value).unwrap()
    }

    fn balance(&self, addr: &Address) -> Coin {
        self.account(addr).balance
    }
}

fn signed(
    sk: &PrivateKey,
    to: Address,
    amount: u64,
    gas: u64,
    nonce: u64,
    payload: TrxPayload,
    variant: SignerVariant,
) -> Vec<u8> {
    let mut tx = Trx::new(
        sk.address(),
        to,
        Coin::from_u64(amount),
        gas,
        Coin::from_u64(10),
        nonce,
        BLOCK_TIME,
        payload,
    );
    sign::sign_trx(&mut tx, sk, CHAIN, variant, SignRole::Sender).unwrap();
    tx.encode_wire()
}

fn transfer(sk: &PrivateKey, to: Address, amount: u64, gas: u64, nonce: u64) -> Vec<u8> {
    signed(sk, to, amount, gas, nonce, TrxPayload::Transfer, SignerVariant::V1)
}

#[test]
fn fee_conservation_for_a_simple_transfer() {
    let mut chain = Chain::start();
    let sender = chain.keys[1].address();
    let receiver = chain.keys[2].address();

    let (end, _) = chain.run_block(vec![transfer(&chain.keys[1], receiver, 5_000, 1_000, 0)]);
    assert_eq!(end.trx_results.len(), 1);
    let r = &end.trx_results[0];
    assert!(r.is_ok(), "transfer rejected: {}", r.log);
    assert_eq!(r.gas_used, 1_000);
    assert_eq!(r.fee, Coin::from_u64(10_000));

    // S loses amount + G x P, R gains exactly amount, S's nonce moves by 1.
    assert_eq!(
        chain.balance(&sender),
        Coin::from_u64(1_000_000_000 - 5_000 - 10_000)
    );
    assert_eq!(chain.balance(&receiver), Coin::from_u64(1_000_000_000 + 5_000));
    assert_eq!(chain.account(&sender).nonce, 1);
}

#[test]
fn deterministic_outcomes_and_hashes_across_replicas() {
    let mut a = Chain::start();
    // Replica B shares A's genesis by reusing its keys.
    let keys: Vec<PrivateKey> = a.keys.clone();
    let genesis = GenesisAppState {
        holders: keys
            .iter()
            .map(|k| GenesisHolder {
                address: k.address(),
                balance: Coin::from_u64(1_000_000_000),
                name: String::new(),
            })
            .collect(),
        validators: vec![GenesisValidator {
            address: keys[0].address(),
            stake: Coin::from_u64(5_000_000_000),
        }],
        params: test_params(),
    };
    let b_app = BeatozApp::new(CHAIN, Arc::new(MemMetaStore::new()), 1).unwrap();
    b_app.init_chain(&genesis).unwrap();
    let mut b = Chain {
        app: b_app,
        keys,
        height: 0,
    };

    let batch = |c: &Chain| {
        vec![
            transfer(&c.keys[1], c.keys[2].address(), 100, 1_000, 0),
            transfer(&c.keys[1], c.keys[0].address(), 200, 1_000, 1),
            // Wrong nonce: rejected, must reject identically everywhere.
            transfer(&c.keys[2], c.keys[1].address(), 300, 1_000, 7),
            b"not a transaction".to_vec(),
        ]
    };

    // Replica A prepares on 4 workers, replica B on 1: completion order
    // differs, committed output must not.
    let (end_a, commit_a) = a.run_block(batch(&a));
    let (end_b, commit_b) = b.run_block(batch(&b));

    let codes_a: Vec<u32> = end_a.trx_results.iter().map(|r| r.code).collect();
    let codes_b: Vec<u32> = end_b.trx_results.iter().map(|r| r.code).collect();
    assert_eq!(codes_a, codes_b);
    assert_eq!(codes_a[0], 0);
    assert_eq!(codes_a[1], 0);
    assert_ne!(codes_a[2], 0);
    assert_ne!(codes_a[3], 0);

    assert_eq!(commit_a.app_hash, commit_b.app_hash);
    assert_eq!(commit_a.height, commit_b.height);
    for k in &a.keys {
        assert_eq!(a.balance(&k.address()), b.balance(&k.address()));
    }
}

#[test]
fn block_gas_accounting_matches_successful_transactions() {
    let mut chain = Chain::start();
    let receiver = chain.keys[2].address();

    let txs = vec![
        transfer(&chain.keys[1], receiver, 100, 1_000, 0),
        transfer(&chain.keys[1], receiver, 100, 2_000, 1),
        // Unaffordable: fails validation, must not consume pool gas.
        transfer(&chain.keys[2], receiver, u64::MAX / 2, 1_000, 0),
    ];
    let (end, _) = chain.run_block(txs);

    let successful_gas: u64 = end
        .trx_results
        .iter()
        .filter(|r| r.is_ok())
        .map(|r| r.gas_used)
        .sum();
    assert_eq!(successful_gas, 3_000);

    let res = chain.app.query(&RequestQuery {
        path: "block/committed".into(),
        data: Vec::new(),
    });
    let committed: serde_json::Value = serde_json::from_slice(&res.value).unwrap();
    assert_eq!(committed["gasUsed"], "3000");
    assert_eq!(committed["feeSum"], "30000");
}

#[test]
fn dependent_transactions_execute_in_submission_order() {
    let mut chain = Chain::start();
    let receiver = chain.keys[2].address();

    // Same sender, consecutive nonces, one block. Preparation may finish
    // in any order; execution must consume them in submission order or
    // the second nonce check fails.
    let txs = (0..8)
        .map(|nonce| transfer(&chain.keys[1], receiver, 10, 1_000, nonce))
        .collect();
    let (end, _) = chain.run_block(txs);
    for r in &end.trx_results {
        assert!(r.is_ok(), "rejected: {}", r.log);
    }
    assert_eq!(chain.account(&chain.keys[1].address()).nonce, 8);
}

#[test]
fn concurrent_creation_of_one_receiver_is_idempotent() {
    let mut chain = Chain::start();
    let fresh = Address([0x77; 20]);

    // Many senders pay one brand-new address in the same block; every
    // prepared context must resolve the same underlying account.
    let txs = vec![
        transfer(&chain.keys[0], fresh, 111, 1_000, 0),
        transfer(&chain.keys[1], fresh, 222, 1_000, 0),
        transfer(&chain.keys[2], fresh, 333, 1_000, 0),
    ];
    let (end, _) = chain.run_block(txs);
    assert!(end.trx_results.iter().all(|r| r.is_ok()));
    assert_eq!(chain.balance(&fresh), Coin::from_u64(666));
}

#[test]
fn adaptive_gas_limit_follows_block_usage() {
    let mut chain = Chain::start();
    let receiver = chain.keys[2].address();

    // Shrink the live limit down to a controllable 10,000 first.
    // Re-run genesis with a 10,000 limit instead: simpler to start there.
    let keys: Vec<PrivateKey> = chain.keys.clone();
    let mut params = test_params();
    params.block_gas_limit = 10_000;
    let genesis = GenesisAppState {
        holders: keys
            .iter()
            .map(|k| GenesisHolder {
                address: k.address(),
                balance: Coin::from_u64(1_000_000_000),
                name: String::new(),
            })
            .collect(),
        validators: vec![],
        params,
    };
    let app = BeatozApp::new(CHAIN, Arc::new(MemMetaStore::new()), 2).unwrap();
    app.init_chain(&genesis).unwrap();
    chain = Chain {
        app,
        keys,
        height: 0,
    };

    // 9,500 of 10,000 used: >90% full, grow 10%.
    let (end, _) = chain.run_block(vec![transfer(&chain.keys[1], receiver, 1, 9_500, 0)]);
    assert!(end.trx_results[0].is_ok());
    assert_eq!(end.next_block_gas_limit, 11_000);

    // 50 of 11,000 used: <1% full, shrink 1% (11,000 - 110).
    let (end, _) = chain.run_block(vec![transfer(&chain.keys[1], receiver, 1, 50, 1)]);
    assert!(end.trx_results[0].is_ok());
    assert_eq!(end.next_block_gas_limit, 10_890);

    // Moderate usage: unchanged.
    let (end, _) = chain.run_block(vec![transfer(&chain.keys[1], receiver, 1, 5_000, 2)]);
    assert!(end.trx_results[0].is_ok());
    assert_eq!(end.next_block_gas_limit, 10_890);

    // Empty block: unchanged.
    let (end, _) = chain.run_block(vec![]);
    assert_eq!(end.next_block_gas_limit, 10_890);
}

#[test]
fn admission_checks_simulate_without_touching_canonical_state() {
    let mut chain = Chain::start();
    let sender = chain.keys[1].address();
    let receiver = chain.keys[2].address();

    // Two dependent pool admissions: the second depends on the first
    // having moved the simulated nonce and balance.
    let tx0 = transfer(&chain.keys[1], receiver, 1_000, 1_000, 0);
    let tx1 = transfer(&chain.keys[1], receiver, 1_000, 1_000, 1);

    let r0 = chain.app.check_trx(CheckKind::New, &tx0);
    assert_eq!(r0.code, 0, "{}", r0.log);
    assert_eq!(r0.sender, Some(sender));
    assert_eq!(r0.gas_wanted, 1_000);

    let r1 = chain.app.check_trx(CheckKind::New, &tx1);
    assert_eq!(r1.code, 0, "{}", r1.log);

    // Re-admitting the first transaction now fails on the simulated nonce.
    let r0_again = chain.app.check_trx(CheckKind::Recheck, &tx0);
    assert_eq!(r0_again.code, 6);

    // None of it reached the canonical ledger.
    assert_eq!(chain.account(&sender).nonce, 0);
    assert_eq!(chain.balance(&sender), Coin::from_u64(1_000_000_000));

    // The mempool lane resets at commit, so the same transaction is
    // admissible again afterwards.
    chain.run_block(vec![]);
    let r0_fresh = chain.app.check_trx(CheckKind::Recheck, &tx0);
    assert_eq!(r0_fresh.code, 0, "{}", r0_fresh.log);
}

#[test]
fn rejected_transactions_do_not_abort_the_block() {
    let mut chain = Chain::start();
    let receiver = chain.keys[2].address();

    let mut bad_sig = transfer(&chain.keys[1], receiver, 100, 1_000, 0);
    // Corrupt one signature byte after signing.
    let tampered_at = bad_sig.len() - 40;
    bad_sig[tampered_at] ^= 0x01;

    let unknown_sender = {
        let stranger = PrivateKey::generate(&mut OsRng);
        transfer(&stranger, receiver, 100, 1_000, 0)
    };

    let txs = vec![
        b"garbage".to_vec(),
        bad_sig,
        unknown_sender,
        transfer(&chain.keys[1], receiver, 100, 1_000, 0),
    ];
    let (end, _) = chain.run_block(txs);
    assert_eq!(end.trx_results.len(), 4);
    assert_eq!(end.trx_results[0].code, 1); // decode
    assert_eq!(end.trx_results[1].code, 4); // signature
    assert_eq!(end.trx_results[2].code, 5); // unknown sender
    assert!(end.trx_results[3].is_ok(), "{}", end.trx_results[3].log);
}

#[test]
fn gas_policy_checked_at_preparation() {
    let mut chain = Chain::start();
    let receiver = chain.keys[2].address();

    // Declared gas price must equal the governance price (10).
    let mut tx = Trx::new(
        chain.keys[1].address(),
        receiver,
        Coin::from_u64(1),
        1_000,
        Coin::from_u64(11),
        0,
        BLOCK_TIME,
        TrxPayload::Transfer,
    );
    sign::sign_trx(&mut tx, &chain.keys[1], CHAIN, SignerVariant::V1, SignRole::Sender).unwrap();
    let wrong_price = tx.encode_wire();

    // Gas below the governance minimum.
    let wrong_gas = transfer(&chain.keys[1], receiver, 1, 5, 0);

    let (end, _) = chain.run_block(vec![wrong_price, wrong_gas]);
    assert_eq!(end.trx_results[0].code, 8);
    assert_eq!(end.trx_results[1].code, 9);
}

#[test]
fn byzantine_validators_are_slashed_at_begin_block() {
    let mut chain = Chain::start();
    let validator = chain.keys[0].address();

    let before = chain.app.query(&RequestQuery {
        path: "staking/power".into(),
        data: validator.as_bytes().to_vec(),
    });
    let before: serde_json::Value = serde_json::from_slice(&before.value).unwrap();
    assert_eq!(before["power"], "5");

    // 50% slash of a 5,000,000,000 stake leaves 2 units of power.
    chain.run_block_with_byzantine(vec![], vec![validator]);

    let after = chain.app.query(&RequestQuery {
        path: "staking/power".into(),
        data: validator.as_bytes().to_vec(),
    });
    let after: serde_json::Value = serde_json::from_slice(&after.value).unwrap();
    assert_eq!(after["power"], "2");
}

#[test]
fn contract_deploy_and_call_meter_their_own_gas() {
    let mut chain = Chain::start();
    let code = vec![0xC0u8; 32];

    // Deploy addresses the zero address.
    let deploy = signed(
        &chain.keys[1],
        Address::ZERO,
        0,
        100_000,
        0,
        TrxPayload::ContractCall { data: code.clone() },
        SignerVariant::V1,
    );
    let (end, _) = chain.run_block(vec![deploy]);
    let r = &end.trx_results[0];
    assert!(r.is_ok(), "deploy rejected: {}", r.log);
    // The VM consumed metered gas, not the declared limit.
    assert_eq!(r.gas_used, 21_000 + 16 * code.len() as u64);
    let contract = Address::from_slice(&r.return_data).unwrap();

    // Call the deployed contract.
    let input = b"ping".to_vec();
    let call = signed(
        &chain.keys[1],
        contract,
        0,
        100_000,
        1,
        TrxPayload::ContractCall { data: input.clone() },
        SignerVariant::V1,
    );
    let (end, _) = chain.run_block(vec![call]);
    let r = &end.trx_results[0];
    assert!(r.is_ok(), "call rejected: {}", r.log);
    assert_eq!(r.gas_used, 21_000 + 16 * input.len() as u64);
    let expected = beatoz_crypto::hash::sha256([code.as_slice(), input.as_slice()].concat());
    assert_eq!(r.return_data, expected.to_vec());

    // Calling an address without code is rejected, with the block intact.
    let bad_call = signed(
        &chain.keys[1],
        chain.keys[2].address(),
        0,
        100_000,
        2,
        TrxPayload::ContractCall { data: input },
        SignerVariant::V1,
    );
    let (end, _) = chain.run_block(vec![bad_call]);
    assert_eq!(end.trx_results[0].code, 11);
}

#[test]
fn staking_governance_and_reward_flow() {
    let mut chain = Chain::start();
    let validator = chain.keys[0].address();

    // Block 1: the validator submits a proposal opening at height 2.
    let proposal = signed(
        &chain.keys[0],
        Address::ZERO,
        0,
        1_000,
        0,
        TrxPayload::ProposalSubmit {
            message: "raise the block reward".into(),
            start_height: 2,
            voting_blocks: 2,
            options: vec!["yes".into(), "no".into()],
        },
        SignerVariant::V0,
    );
    let (end, _) = chain.run_block(vec![proposal]);
    assert!(end.trx_results[0].is_ok(), "{}", end.trx_results[0].log);
    let proposal_id = u64::from_be_bytes(end.trx_results[0].return_data.clone().try_into().unwrap());

    // A non-validator may not vote.
    let outsider_vote = signed(
        &chain.keys[1],
        Address::ZERO,
        0,
        1_000,
        0,
        TrxPayload::ProposalVote {
            proposal_id,
            choice: 0,
        },
        SignerVariant::V1,
    );
    let (end, _) = chain.run_block(vec![outsider_vote]);
    assert_eq!(end.trx_results[0].code, 12);

    // Block 3: the validator votes inside the window [2, 4).
    let vote = signed(
        &chain.keys[0],
        Address::ZERO,
        0,
        1_000,
        1,
        TrxPayload::ProposalVote {
            proposal_id,
            choice: 0,
        },
        SignerVariant::V1,
    );
    let (end, _) = chain.run_block(vec![vote]);
    assert!(end.trx_results[0].is_ok(), "{}", end.trx_results[0].log);

    // Block 4: the window has closed; the freeze event fires.
    let (end, _) = chain.run_block(vec![]);
    assert!(end
        .events
        .iter()
        .any(|e| e.kind == "proposalFrozen"
            && e.attributes.contains(&("status".to_string(), "passed".to_string()))));

    // The proposer accrued 500 reward per committed block; withdraw some.
    let before = chain.balance(&validator);
    let withdraw = signed(
        &chain.keys[0],
        Address::ZERO,
        0,
        1_000,
        2,
        TrxPayload::Withdraw {
            req_amt: Coin::from_u64(900),
        },
        SignerVariant::V1,
    );
    let (end, _) = chain.run_block(vec![withdraw]);
    assert!(end.trx_results[0].is_ok(), "{}", end.trx_results[0].log);
    // +900 reward, -10,000 fee for the withdrawal itself.
    assert_eq!(
        chain.balance(&validator),
        before
            .checked_add(&Coin::from_u64(900))
            .checked_sub(&Coin::from_u64(10_000))
            .unwrap()
    );
}

#[test]
fn info_survives_restart_through_meta_storage() {
    let meta = Arc::new(MemMetaStore::new());
    let keys: Vec<PrivateKey> = (0..2).map(|_| PrivateKey::generate(&mut OsRng)).collect();
    let genesis = GenesisAppState {
        holders: keys
            .iter()
            .map(|k| GenesisHolder {
                address: k.address(),
                balance: Coin::from_u64(1_000_000_000),
                name: String::new(),
            })
            .collect(),
        validators: vec![],
        params: test_params(),
    };

    let app = BeatozApp::new(CHAIN, meta.clone(), 2).unwrap();
    app.init_chain(&genesis).unwrap();
    let mut chain = Chain {
        app,
        keys,
        height: 0,
    };
    let (_, commit) = chain.run_block(vec![transfer(
        &chain.keys[0],
        chain.keys[1].address(),
        42,
        1_000,
        0,
    )]);

    // A fresh process over the same meta store reports the same head.
    let reopened = BeatozApp::new(CHAIN, meta, 2).unwrap();
    let info = reopened.info();
    assert_eq!(info.last_height, 1);
    assert_eq!(info.last_app_hash, commit.app_hash);
}

#[test]
fn lifecycle_violations_are_fatal_errors() {
    let chain = Chain::start();

    // Delivering outside a block is a lifecycle violation.
    assert!(chain.app.deliver_trx(vec![1, 2, 3]).is_err());
    assert!(chain.app.end_block().is_err());
    assert!(chain.app.commit().is_err());

    // A height gap is rejected before any hook runs.
    let header = BlockHeader {
        height: 5,
        time: BLOCK_TIME,
        chain_id: CHAIN.into(),
        proposer: Address::ZERO,
        byzantine: vec![],
    };
    assert!(chain.app.begin_block(&header).is_err());
}

#[test]
fn stake_and_unstake_round_trip() {
    let mut chain = Chain::start();
    let staker = chain.keys[1].address();

    // Bond 2 power's worth out of the spendable balance... which the
    // holder cannot afford; genesis holders carry 1e9.
    // Bond exactly the validator minimum instead.
    let stake = signed(
        &chain.keys[1],
        Address::ZERO,
        999_000_000,
        1_000,
        0,
        TrxPayload::Stake,
        SignerVariant::V1,
    );
    // 999,000,000 + fee 10,000 fits in 1e9, but misses the 1e9 minimum.
    let (end, _) = chain.run_block(vec![stake]);
    assert_eq!(end.trx_results[0].code, 11);

    // Fund the staker first, then bond the minimum. The failed attempt
    // above consumed nothing, nonce included.
    chain.run_block(vec![transfer(
        &chain.keys[2],
        staker,
        600_000_000,
        1_000,
        0,
    )]);
    let stake = signed(
        &chain.keys[1],
        Address::ZERO,
        1_000_000_000,
        1_000,
        0,
        TrxPayload::Stake,
        SignerVariant::V1,
    );
    let (end, _) = chain.run_block(vec![stake]);
    assert!(end.trx_results[0].is_ok(), "{}", end.trx_results[0].log);

    let res = chain.app.query(&RequestQuery {
        path: "staking/power".into(),
        data: staker.as_bytes().to_vec(),
    });
    let power: serde_json::Value = serde_json::from_slice(&res.value).unwrap();
    assert_eq!(power["power"], "1");

    // Unstake it all; the bond returns after the 2-block unbonding delay.
    let before = chain.balance(&staker);
    let unstake = signed(
        &chain.keys[1],
        Address::ZERO,
        0,
        1_000,
        1,
        TrxPayload::Unstake {
            amount: Coin::from_u64(1_000_000_000),
        },
        SignerVariant::V1,
    );
    let (end, _) = chain.run_block(vec![unstake]);
    assert!(end.trx_results[0].is_ok(), "{}", end.trx_results[0].log);

    chain.run_block(vec![]);
    let (end, _) = chain.run_block(vec![]); // release height reached
    assert!(end
        .events
        .iter()
        .any(|e| e.kind == "unbondingRelease"));
    assert_eq!(
        chain.balance(&staker),
        before
            // unstake fee
            .checked_sub(&Coin::from_u64(10_000))
            .unwrap()
            .checked_add(&Coin::from_u64(1_000_000_000))
    );
}
