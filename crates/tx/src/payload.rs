// Path: crates/tx/src/payload.rs
//! The closed union of transaction payloads.
//!
//! The type set is fixed, so validate/execute dispatch is a plain match on
//! the variant rather than open-ended dynamic dispatch. Every variant has
//! a stable numeric tag that must equal the transaction's declared type
//! tag, and a per-type size bound that is checked against the raw payload
//! bytes *before* decoding — an implausibly large payload for its declared
//! type is a denial-of-service attempt, not just a malformed transaction.

use beatoz_types::codec::{put_field, FieldReader};
use beatoz_types::{Coin, TrxError};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Payload type tags. Stable wire values; never renumber.
pub const TAG_TRANSFER: u32 = 0;
pub const TAG_STAKE: u32 = 1;
pub const TAG_UNSTAKE: u32 = 2;
pub const TAG_PROPOSAL: u32 = 3;
pub const TAG_VOTE: u32 = 4;
pub const TAG_CONTRACT: u32 = 5;
pub const TAG_SETDOC: u32 = 6;
pub const TAG_WITHDRAW: u32 = 7;

/// One payload per transaction type. Transfer and stake carry no body of
/// their own: the moved amount travels in the transaction envelope. All
/// other types leave the envelope amount at zero.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "type")]
pub enum TrxPayload {
    Transfer,
    Stake,
    Unstake {
        amount: Coin,
    },
    ProposalSubmit {
        message: String,
        #[serde(with = "beatoz_types::json::u64_string")]
        start_height: u64,
        #[serde(with = "beatoz_types::json::u64_string")]
        voting_blocks: u64,
        options: Vec<String>,
    },
    ProposalVote {
        #[serde(with = "beatoz_types::json::u64_string")]
        proposal_id: u64,
        choice: u32,
    },
    ContractCall {
        data: Vec<u8>,
    },
    SetDoc {
        name: String,
        url: String,
    },
    Withdraw {
        req_amt: Coin,
    },
}

impl TrxPayload {
    /// The payload's own type tag.
    pub fn tag(&self) -> u32 {
        match self {
            Self::Transfer => TAG_TRANSFER,
            Self::Stake => TAG_STAKE,
            Self::Unstake { .. } => TAG_UNSTAKE,
            Self::ProposalSubmit { .. } => TAG_PROPOSAL,
            Self::ProposalVote { .. } => TAG_VOTE,
            Self::ContractCall { .. } => TAG_CONTRACT,
            Self::SetDoc { .. } => TAG_SETDOC,
            Self::Withdraw { .. } => TAG_WITHDRAW,
        }
    }

    /// Upper bound on the encoded payload size for a declared tag, in
    /// bytes. Checked before decoding.
    pub fn max_size(tag: u32) -> usize {
        match tag {
            TAG_TRANSFER | TAG_STAKE => 0,
            TAG_UNSTAKE => 64,
            TAG_VOTE => 64,
            TAG_WITHDRAW => 64,
            TAG_SETDOC => 2 * 1024,
            TAG_PROPOSAL => 32 * 1024,
            TAG_CONTRACT => 1024 * 1024,
            _ => 0,
        }
    }

    /// Encodes the payload body in the recursive length-prefixed form.
    /// No-body variants encode to the empty string.
    pub fn encode_wire(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::Transfer | Self::Stake => {}
            Self::Unstake { amount } => {
                put_field(&mut out, &amount.to_be_bytes());
            }
            Self::ProposalSubmit {
                message,
                start_height,
                voting_blocks,
                options,
            } => {
                put_field(&mut out, message.as_bytes());
                put_field(&mut out, &start_height.to_be_bytes());
                put_field(&mut out, &voting_blocks.to_be_bytes());
                let mut opts = Vec::new();
                for o in options {
                    put_field(&mut opts, o.as_bytes());
                }
                put_field(&mut out, &opts);
            }
            Self::ProposalVote { proposal_id, choice } => {
                put_field(&mut out, &proposal_id.to_be_bytes());
                put_field(&mut out, &choice.to_be_bytes());
            }
            Self::ContractCall { data } => {
                put_field(&mut out, data);
            }
            Self::SetDoc { name, url } => {
                put_field(&mut out, name.as_bytes());
                put_field(&mut out, url.as_bytes());
            }
            Self::Withdraw { req_amt } => {
                put_field(&mut out, &req_amt.to_be_bytes());
            }
        }
        out
    }

    /// Decodes a payload body for the declared `tag`, enforcing the
    /// per-type size bound first.
    pub fn decode_wire(tag: u32, body: &[u8]) -> Result<Self, TrxError> {
        let max = Self::max_size(tag);
        if body.len() > max {
            return Err(TrxError::OversizePayload {
                declared: tag,
                size: body.len(),
                max,
            });
        }
        let mut rd = FieldReader::new(body);
        let payload = match tag {
            TAG_TRANSFER => Self::Transfer,
            TAG_STAKE => Self::Stake,
            TAG_UNSTAKE => Self::Unstake {
                amount: Coin::from_be_bytes(rd.next_field().map_err(TrxError::Decode)?),
            },
            TAG_PROPOSAL => {
                let message = read_string(&mut rd)?;
                let start_height = read_u64(&mut rd)?;
                let voting_blocks = read_u64(&mut rd)?;
                let opts_buf = rd.next_field().map_err(TrxError::Decode)?;
                let mut opts_rd = FieldReader::new(opts_buf);
                let mut options = Vec::new();
                while !opts_rd.is_done() {
                    let f = opts_rd.next_field().map_err(TrxError::Decode)?;
                    options.push(
                        String::from_utf8(f.to_vec()).map_err(|e| TrxError::Decode(e.to_string()))?,
                    );
                }
                Self::ProposalSubmit {
                    message,
                    start_height,
                    voting_blocks,
                    options,
                }
            }
            TAG_VOTE => {
                let proposal_id = read_u64(&mut rd)?;
                let choice_bytes = rd.next_field().map_err(TrxError::Decode)?;
                let choice = u32::from_be_bytes(
                    choice_bytes
                        .try_into()
                        .map_err(|_| TrxError::Decode("bad vote choice".into()))?,
                );
                Self::ProposalVote { proposal_id, choice }
            }
            TAG_CONTRACT => Self::ContractCall {
                data: rd.next_field().map_err(TrxError::Decode)?.to_vec(),
            },
            TAG_SETDOC => {
                let name = read_string(&mut rd)?;
                let url = read_string(&mut rd)?;
                Self::SetDoc { name, url }
            }
            TAG_WITHDRAW => Self::Withdraw {
                req_amt: Coin::from_be_bytes(rd.next_field().map_err(TrxError::Decode)?),
            },
            other => return Err(TrxError::Decode(format!("unknown type tag {}", other))),
        };
        rd.finish().map_err(TrxError::Decode)?;
        Ok(payload)
    }
}

fn read_string(rd: &mut FieldReader<'_>) -> Result<String, TrxError> {
    let f = rd.next_field().map_err(TrxError::Decode)?;
    String::from_utf8(f.to_vec()).map_err(|e| TrxError::Decode(e.to_string()))
}

fn read_u64(rd: &mut FieldReader<'_>) -> Result<u64, TrxError> {
    let f = rd.next_field().map_err(TrxError::Decode)?;
    let arr: [u8; 8] = f
        .try_into()
        .map_err(|_| TrxError::Decode("bad u64 field".into()))?;
    Ok(u64::from_be_bytes(arr))
}
