// Path: crates/ledger/src/gov.rs
//! The governance ledger: chain parameters, proposals and votes.

use beatoz_api::{BlockContext, GovStore, Ledger, TrxContext};
use beatoz_crypto::hash::sha256;
use beatoz_types::codec;
use beatoz_types::{Address, ChainError, Event, GovParams, TrxError};
use beatoz_tx::TrxPayload;
use parity_scale_codec::{Decode, Encode};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum ProposalStatus {
    Voting,
    Passed,
    Rejected,
}

/// One governance proposal. Votes are weighted with the voter's staking
/// power at the time the vote landed.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    pub message: String,
    pub options: Vec<String>,
    pub start_height: u64,
    pub end_height: u64,
    pub votes: BTreeMap<Address, (u32, u64)>,
    pub status: ProposalStatus,
}

impl Proposal {
    /// True while votes are accepted at `height`.
    pub fn in_voting_window(&self, height: u64) -> bool {
        height >= self.start_height && height < self.end_height
    }
}

pub struct GovLedger {
    params: RwLock<GovParams>,
    proposals: RwLock<BTreeMap<u64, Proposal>>,
    next_id: Mutex<u64>,
    version: Mutex<u64>,
}

impl GovLedger {
    pub fn new(params: GovParams) -> Self {
        Self {
            params: RwLock::new(params),
            proposals: RwLock::new(BTreeMap::new()),
            next_id: Mutex::new(1),
            version: Mutex::new(0),
        }
    }

    pub fn proposal(&self, id: u64) -> Option<Proposal> {
        self.proposals.read().get(&id).cloned()
    }

    fn state_hash(&self) -> [u8; 32] {
        let params = self.params.read().clone();
        let proposals = self.proposals.read();
        sha256(codec::to_bytes_canonical(&(&params, &*proposals)))
    }
}

impl GovStore for GovLedger {
    fn params(&self) -> GovParams {
        self.params.read().clone()
    }
}

impl Ledger for GovLedger {
    fn name(&self) -> &'static str {
        "gov"
    }

    fn validate_trx(&self, ctx: &TrxContext) -> Result<(), TrxError> {
        match &ctx.tx.payload {
            TrxPayload::ProposalSubmit {
                message,
                start_height,
                voting_blocks,
                options,
            } => {
                if ctx.sender_power == 0 {
                    return Err(TrxError::NoRight(
                        "only validators may submit proposals".into(),
                    ));
                }
                if message.is_empty() {
                    return Err(TrxError::InvalidPayload("empty proposal message".into()));
                }
                if options.is_empty() {
                    return Err(TrxError::InvalidPayload("proposal without options".into()));
                }
                if *start_height <= ctx.height {
                    return Err(TrxError::InvalidPayload(format!(
                        "start height {} not after current height {}",
                        start_height, ctx.height
                    )));
                }
                let max_window = ctx.params.voting_blocks;
                if *voting_blocks == 0 || *voting_blocks > max_window {
                    return Err(TrxError::InvalidPayload(format!(
                        "voting window must be 1..={} blocks",
                        max_window
                    )));
                }
                Ok(())
            }
            TrxPayload::ProposalVote { proposal_id, choice } => {
                if ctx.sender_power == 0 {
                    return Err(TrxError::NoRight("only validators may vote".into()));
                }
                let proposals = self.proposals.read();
                let prop = proposals.get(proposal_id).ok_or_else(|| {
                    TrxError::InvalidPayload(format!("unknown proposal {}", proposal_id))
                })?;
                if !prop.in_voting_window(ctx.height) {
                    return Err(TrxError::OutsideVotingWindow {
                        height: ctx.height,
                        start: prop.start_height,
                        end: prop.end_height,
                    });
                }
                if *choice as usize >= prop.options.len() {
                    return Err(TrxError::InvalidPayload(format!(
                        "choice {} out of range",
                        choice
                    )));
                }
                Ok(())
            }
            other => Err(TrxError::Ledger(format!(
                "governance ledger does not own type {}",
                other.tag()
            ))),
        }
    }

    fn execute_trx(&self, ctx: &mut TrxContext) -> Result<(), TrxError> {
        match ctx.tx.payload.clone() {
            TrxPayload::ProposalSubmit {
                message,
                start_height,
                voting_blocks,
                options,
            } => {
                let id = {
                    let mut next = self.next_id.lock();
                    let id = *next;
                    *next += 1;
                    id
                };
                let prop = Proposal {
                    id,
                    proposer: ctx.tx.from,
                    message,
                    options,
                    start_height,
                    end_height: start_height + voting_blocks,
                    votes: BTreeMap::new(),
                    status: ProposalStatus::Voting,
                };
                self.proposals.write().insert(id, prop);
                ctx.return_data = id.to_be_bytes().to_vec();
                ctx.emit(
                    Event::new("proposalSubmit")
                        .attr("id", id.to_string())
                        .attr("proposer", ctx.tx.from.to_string()),
                );
                Ok(())
            }
            TrxPayload::ProposalVote { proposal_id, choice } => {
                let mut proposals = self.proposals.write();
                let prop = proposals.get_mut(&proposal_id).ok_or_else(|| {
                    TrxError::InvalidPayload(format!("unknown proposal {}", proposal_id))
                })?;
                prop.votes
                    .insert(ctx.tx.from, (choice, ctx.sender_power));
                ctx.emit(
                    Event::new("proposalVote")
                        .attr("id", proposal_id.to_string())
                        .attr("voter", ctx.tx.from.to_string())
                        .attr("choice", choice.to_string()),
                );
                Ok(())
            }
            other => Err(TrxError::Ledger(format!(
                "governance ledger does not own type {}",
                other.tag()
            ))),
        }
    }

    fn begin_block(&self, _bctx: &BlockContext) -> Result<Vec<Event>, ChainError> {
        Ok(Vec::new())
    }

    /// Freezes proposals whose window ended at this height and tallies
    /// them: a proposal passes when more than half of the current total
    /// staking power voted for option 0.
    fn end_block(&self, bctx: &BlockContext) -> Result<Vec<Event>, ChainError> {
        let total_power = bctx
            .ledgers
            .staking()
            .map(|s| s.total_power())
            .unwrap_or(0);

        let mut events = Vec::new();
        let mut proposals = self.proposals.write();
        for prop in proposals.values_mut() {
            if prop.status != ProposalStatus::Voting || bctx.height < prop.end_height {
                continue;
            }
            let power_for: u64 = prop
                .votes
                .values()
                .filter(|(choice, _)| *choice == 0)
                .map(|(_, power)| power)
                .sum();
            prop.status = if total_power > 0 && power_for * 2 > total_power {
                ProposalStatus::Passed
            } else {
                ProposalStatus::Rejected
            };
            tracing::info!(
                target: "gov",
                event = "proposal_frozen",
                id = prop.id,
                height = bctx.height,
                passed = (prop.status == ProposalStatus::Passed)
            );
            events.push(
                Event::new("proposalFrozen")
                    .attr("id", prop.id.to_string())
                    .attr(
                        "status",
                        match prop.status {
                            ProposalStatus::Passed => "passed",
                            ProposalStatus::Rejected => "rejected",
                            ProposalStatus::Voting => "voting",
                        },
                    ),
            );
        }
        Ok(events)
    }

    fn commit(&self) -> Result<([u8; 32], u64), ChainError> {
        let mut version = self.version.lock();
        *version += 1;
        Ok((self.state_hash(), *version))
    }

    fn close(&self) -> Result<(), ChainError> {
        Ok(())
    }

    fn as_gov(&self) -> Option<&dyn GovStore> {
        Some(self)
    }
}
