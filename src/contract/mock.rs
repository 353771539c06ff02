//! In-memory provider answering polls-contract calls from fixtures

use crate::contract::abi::{IPollsContract, IERC20};
use crate::contract::{ContractError, Provider};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
pub struct PollFixture {
    pub id: u64,
    pub question: String,
    pub creator: Address,
    pub is_active: bool,
    pub end_time: u64,
    pub total_votes: u64,
}

impl PollFixture {
    pub fn new(id: u64, question: &str) -> Self {
        Self {
            id,
            question: question.to_string(),
            creator: Address::repeat_byte(0x11),
            is_active: true,
            end_time: 1_900_000_000,
            total_votes: 0,
        }
    }

    pub fn votes(mut self, total_votes: u64) -> Self {
        self.total_votes = total_votes;
        self
    }
}

pub struct MockProvider {
    chain_id: u64,
    owner: Address,
    polls: BTreeMap<u64, PollFixture>,
    votes: HashSet<(u64, Address)>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockProvider {
    pub const CONTRACT: Address = Address::repeat_byte(0xcc);

    pub fn new() -> Self {
        Self {
            chain_id: 84532,
            owner: Address::ZERO,
            polls: BTreeMap::new(),
            votes: HashSet::new(),
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_owner(mut self, owner: Address) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_poll(mut self, poll: PollFixture) -> Self {
        self.polls.insert(poll.id, poll);
        self
    }

    pub fn with_vote(mut self, poll_id: u64, voter: Address) -> Self {
        self.votes.insert((poll_id, voter));
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Number of `eth_call`s served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn chain_id(&self) -> Result<u64, ContractError> {
        Ok(self.chain_id)
    }

    async fn call(&self, _to: Address, data: Bytes) -> Result<Bytes, ContractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(ContractError::Unavailable);
        }

        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| ContractError::Decode("short calldata".to_string()))?;

        let encoded = if selector == IPollsContract::ownerCall::SELECTOR {
            IPollsContract::ownerCall::abi_encode_returns(&(self.owner,))
        } else if selector == IPollsContract::nextPollIdCall::SELECTOR {
            let next = self.polls.keys().next_back().map(|id| id + 1).unwrap_or(0);
            IPollsContract::nextPollIdCall::abi_encode_returns(&(U256::from(next),))
        } else if selector == IPollsContract::getPollCall::SELECTOR {
            let call = IPollsContract::getPollCall::abi_decode(&data, true)?;
            let id = u64::try_from(call.pollId).unwrap_or(u64::MAX);
            let empty = PollFixture {
                creator: Address::ZERO,
                ..PollFixture::new(0, "")
            };
            let p = self.polls.get(&id).cloned().unwrap_or(empty);
            IPollsContract::getPollCall::abi_encode_returns(&(
                U256::from(p.id),
                p.question,
                vec!["Yes".to_string(), "No".to_string()],
                U256::from(p.end_time),
                p.is_active,
                p.creator,
                U256::from(1_000_000_000_000_000_000u128),
                U256::from(p.total_votes),
                Address::ZERO,
            ))
        } else if selector == IPollsContract::hasUserVotedCall::SELECTOR {
            let call = IPollsContract::hasUserVotedCall::abi_decode(&data, true)?;
            let id = u64::try_from(call.pollId).unwrap_or(u64::MAX);
            IPollsContract::hasUserVotedCall::abi_encode_returns(&(
                self.votes.contains(&(id, call.user)),
            ))
        } else if selector == IERC20::balanceOfCall::SELECTOR {
            // 1.5 units of a 6-decimal token for everyone
            IERC20::balanceOfCall::abi_encode_returns(&(U256::from(1_500_000u64),))
        } else if selector == IERC20::decimalsCall::SELECTOR {
            IERC20::decimalsCall::abi_encode_returns(&(6u8,))
        } else if selector == IERC20::symbolCall::SELECTOR {
            IERC20::symbolCall::abi_encode_returns(&("USDC".to_string(),))
        } else {
            return Err(ContractError::Decode("unknown selector".to_string()));
        };

        Ok(encoded.into())
    }
}
