//! Contract readers
//!
//! Typed wrappers that encode a call, send it through the injected
//! provider and decode the return data.

use crate::contract::abi::{IPollsContract, IERC20};
use crate::contract::{ContractError, Provider};
use crate::models::{PageRequest, Poll};
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use chrono::DateTime;
use std::sync::Arc;

/// Read-only view of the polls contract
#[derive(Clone)]
pub struct PollsContract {
    provider: Arc<dyn Provider>,
    address: Address,
}

impl PollsContract {
    pub fn new(provider: Arc<dyn Provider>, address: Address) -> Self {
        Self { provider, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    async fn call<C: SolCall>(&self, call: C) -> Result<C::Return, ContractError> {
        let data = self.provider.call(self.address, call.abi_encode().into()).await?;
        Ok(C::abi_decode_returns(&data, true)?)
    }

    pub async fn owner(&self) -> Result<Address, ContractError> {
        Ok(self.call(IPollsContract::ownerCall {}).await?._0)
    }

    /// Id the next created poll will get; existing ids are below it
    pub async fn next_poll_id(&self) -> Result<u64, ContractError> {
        let next = self.call(IPollsContract::nextPollIdCall {}).await?._0;
        to_u64("nextPollId", next)
    }

    /// Poll by id; `None` for ids that were never created
    pub async fn poll(&self, poll_id: u64) -> Result<Option<Poll>, ContractError> {
        let ret = self
            .call(IPollsContract::getPollCall {
                pollId: U256::from(poll_id),
            })
            .await?;

        // unset storage slots decode as a zero creator
        if ret.creator == Address::ZERO {
            return Ok(None);
        }

        let end_secs = i64::try_from(to_u64("endTime", ret.endTime)?)
            .map_err(|_| ContractError::Overflow("endTime"))?;

        Ok(Some(Poll {
            id: to_u64("id", ret.id)?,
            question: ret.question,
            options: ret.options,
            creator: ret.creator,
            is_active: ret.isActive,
            end_time: DateTime::from_timestamp(end_secs, 0)
                .ok_or(ContractError::Overflow("endTime"))?,
            created_at: None,
            total_funding: ret.totalFunding,
            participant_count: to_u64("totalVotes", ret.totalVotes)?,
            funding_token: (ret.fundingToken != Address::ZERO).then_some(ret.fundingToken),
        }))
    }

    /// Newest-first page over poll ids. Ids that do not resolve to a poll
    /// are skipped, so a page can come back short.
    pub async fn polls(&self, page: PageRequest) -> Result<Vec<Poll>, ContractError> {
        let next = self.next_poll_id().await?;

        let ids: Vec<u64> = (0..next).rev().skip(page.skip).take(page.first).collect();
        let mut polls = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(poll) = self.poll(id).await? {
                polls.push(poll);
            }
        }
        Ok(polls)
    }

    pub async fn has_user_voted(&self, poll_id: u64, user: Address) -> Result<bool, ContractError> {
        Ok(self
            .call(IPollsContract::hasUserVotedCall {
                pollId: U256::from(poll_id),
                user,
            })
            .await?
            ._0)
    }
}

/// Read-only view of an ERC-20 token
#[derive(Clone)]
pub struct Erc20 {
    provider: Arc<dyn Provider>,
    address: Address,
}

impl Erc20 {
    pub fn new(provider: Arc<dyn Provider>, address: Address) -> Self {
        Self { provider, address }
    }

    async fn call<C: SolCall>(&self, call: C) -> Result<C::Return, ContractError> {
        let data = self.provider.call(self.address, call.abi_encode().into()).await?;
        Ok(C::abi_decode_returns(&data, true)?)
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256, ContractError> {
        Ok(self.call(IERC20::balanceOfCall { account }).await?._0)
    }

    pub async fn decimals(&self) -> Result<u8, ContractError> {
        Ok(self.call(IERC20::decimalsCall {}).await?._0)
    }

    pub async fn symbol(&self) -> Result<String, ContractError> {
        Ok(self.call(IERC20::symbolCall {}).await?._0)
    }
}

fn to_u64(field: &'static str, value: U256) -> Result<u64, ContractError> {
    u64::try_from(value).map_err(|_| ContractError::Overflow(field))
}
