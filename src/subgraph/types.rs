//! Raw subgraph entities and their mapping to domain types
//!
//! GraphQL `BigInt` and `Bytes` arrive as strings; they are parsed here and
//! any value that does not parse is reported as a mapping error rather than
//! silently zeroed.

use crate::models::{Claim, DailyStats, Distribution, Funding, GlobalStats, Poll, Vote};
use crate::subgraph::client::SubgraphError;
use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPoll {
    pub id: String,
    pub poll_id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub is_active: bool,
    pub end_time: String,
    pub created_at: Option<String>,
    pub total_funding: String,
    pub vote_count: String,
    pub creator: String,
    pub funding_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPollRef {
    pub poll_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFunding {
    pub id: String,
    pub poll: RawPollRef,
    pub token: String,
    pub amount: String,
    pub funder: String,
    pub timestamp: String,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDistribution {
    pub id: String,
    pub poll: RawPollRef,
    pub recipient: String,
    pub token: String,
    pub amount: String,
    pub timestamp: String,
    pub event_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawClaim {
    pub id: String,
    pub poll: RawPollRef,
    pub claimer: String,
    pub token: String,
    pub amount: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVote {
    pub id: String,
    pub poll: RawPollRef,
    pub voter: String,
    pub option_index: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVoteRef {
    pub poll: RawPollRef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGlobalStats {
    pub total_polls: String,
    pub total_votes: String,
    pub total_funding: String,
    pub total_distributed: String,
    pub unique_voters: String,
    pub unique_funders: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDailyStats {
    pub day_start_timestamp: String,
    pub polls_created: String,
    pub votes_cast: String,
    pub funding_amount: String,
}

// ============================================
// Response envelopes
// ============================================

#[derive(Debug, Deserialize)]
pub struct PollsData {
    pub polls: Vec<RawPoll>,
}

#[derive(Debug, Deserialize)]
pub struct PollData {
    pub poll: Option<RawPoll>,
}

#[derive(Debug, Deserialize)]
pub struct FundingsData {
    pub fundings: Vec<RawFunding>,
}

#[derive(Debug, Deserialize)]
pub struct DistributionsData {
    pub distributions: Vec<RawDistribution>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimsData {
    pub claims: Vec<RawClaim>,
}

#[derive(Debug, Deserialize)]
pub struct VotesData {
    pub votes: Vec<RawVote>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRefsData {
    pub votes: Vec<RawVoteRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStatsData {
    pub global_stats: Option<RawGlobalStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatsData {
    pub daily_stats: Vec<RawDailyStats>,
}

// ============================================
// Field parsers
// ============================================

fn mapping(field: &'static str, value: &str) -> SubgraphError {
    SubgraphError::Mapping {
        field,
        value: value.to_string(),
    }
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, SubgraphError> {
    value.trim().parse().map_err(|_| mapping(field, value))
}

fn parse_u256(field: &'static str, value: &str) -> Result<U256, SubgraphError> {
    U256::from_str_radix(value.trim(), 10).map_err(|_| mapping(field, value))
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, SubgraphError> {
    value.trim().parse().map_err(|_| mapping(field, value))
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, SubgraphError> {
    let secs: i64 = value.trim().parse().map_err(|_| mapping(field, value))?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| mapping(field, value))
}

fn parse_poll_ref(poll: &RawPollRef) -> Result<u64, SubgraphError> {
    parse_u64("poll.pollId", &poll.poll_id)
}

// ============================================
// Mapping
// ============================================

impl TryFrom<RawPoll> for Poll {
    type Error = SubgraphError;

    fn try_from(raw: RawPoll) -> Result<Self, Self::Error> {
        let funding_token = match raw.funding_token.as_deref() {
            Some(token) => {
                let token = parse_address("fundingToken", token)?;
                // zero address means native ETH
                (token != Address::ZERO).then_some(token)
            }
            None => None,
        };

        Ok(Poll {
            id: parse_u64("pollId", &raw.poll_id)?,
            question: raw.question,
            options: raw.options,
            creator: parse_address("creator", &raw.creator)?,
            is_active: raw.is_active,
            end_time: parse_timestamp("endTime", &raw.end_time)?,
            created_at: raw
                .created_at
                .as_deref()
                .map(|t| parse_timestamp("createdAt", t))
                .transpose()?,
            total_funding: parse_u256("totalFunding", &raw.total_funding)?,
            participant_count: parse_u64("voteCount", &raw.vote_count)?,
            funding_token,
        })
    }
}

impl TryFrom<RawFunding> for Funding {
    type Error = SubgraphError;

    fn try_from(raw: RawFunding) -> Result<Self, Self::Error> {
        Ok(Funding {
            poll_id: parse_poll_ref(&raw.poll)?,
            token: parse_address("token", &raw.token)?,
            amount: parse_u256("amount", &raw.amount)?,
            funder: parse_address("funder", &raw.funder)?,
            timestamp: parse_timestamp("timestamp", &raw.timestamp)?,
            tx_hash: raw.transaction_hash,
            id: raw.id,
        })
    }
}

impl TryFrom<RawDistribution> for Distribution {
    type Error = SubgraphError;

    fn try_from(raw: RawDistribution) -> Result<Self, Self::Error> {
        Ok(Distribution {
            poll_id: parse_poll_ref(&raw.poll)?,
            recipient: parse_address("recipient", &raw.recipient)?,
            token: parse_address("token", &raw.token)?,
            amount: parse_u256("amount", &raw.amount)?,
            timestamp: parse_timestamp("timestamp", &raw.timestamp)?,
            event_type: raw.event_type,
            id: raw.id,
        })
    }
}

impl TryFrom<RawClaim> for Claim {
    type Error = SubgraphError;

    fn try_from(raw: RawClaim) -> Result<Self, Self::Error> {
        Ok(Claim {
            poll_id: parse_poll_ref(&raw.poll)?,
            claimer: parse_address("claimer", &raw.claimer)?,
            token: parse_address("token", &raw.token)?,
            amount: parse_u256("amount", &raw.amount)?,
            timestamp: parse_timestamp("timestamp", &raw.timestamp)?,
            id: raw.id,
        })
    }
}

impl TryFrom<RawVote> for Vote {
    type Error = SubgraphError;

    fn try_from(raw: RawVote) -> Result<Self, Self::Error> {
        let option_index = parse_u64("optionIndex", &raw.option_index)?;
        Ok(Vote {
            poll_id: parse_poll_ref(&raw.poll)?,
            voter: parse_address("voter", &raw.voter)?,
            option_index: u32::try_from(option_index)
                .map_err(|_| mapping("optionIndex", &raw.option_index))?,
            timestamp: parse_timestamp("timestamp", &raw.timestamp)?,
            id: raw.id,
        })
    }
}

impl TryFrom<RawGlobalStats> for GlobalStats {
    type Error = SubgraphError;

    fn try_from(raw: RawGlobalStats) -> Result<Self, Self::Error> {
        Ok(GlobalStats {
            total_polls: parse_u64("totalPolls", &raw.total_polls)?,
            total_votes: parse_u64("totalVotes", &raw.total_votes)?,
            total_funding: parse_u256("totalFunding", &raw.total_funding)?,
            total_distributed: parse_u256("totalDistributed", &raw.total_distributed)?,
            unique_voters: parse_u64("uniqueVoters", &raw.unique_voters)?,
            unique_funders: parse_u64("uniqueFunders", &raw.unique_funders)?,
        })
    }
}

impl TryFrom<RawDailyStats> for DailyStats {
    type Error = SubgraphError;

    fn try_from(raw: RawDailyStats) -> Result<Self, Self::Error> {
        Ok(DailyStats {
            day_start: parse_timestamp("dayStartTimestamp", &raw.day_start_timestamp)?,
            polls_created: parse_u64("pollsCreated", &raw.polls_created)?,
            votes_cast: parse_u64("votesCast", &raw.votes_cast)?,
            funding_amount: parse_u256("fundingAmount", &raw.funding_amount)?,
        })
    }
}

/// Map every raw item, failing on the first bad one
pub fn map_all<R, T>(raw: Vec<R>) -> Result<Vec<T>, SubgraphError>
where
    T: TryFrom<R, Error = SubgraphError>,
{
    raw.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_poll_json() -> serde_json::Value {
        json!({
            "id": "0x0000000000000000000000000000000000000000000000000000000000000003",
            "pollId": "3",
            "question": "Ship quests in v2?",
            "options": ["Yes", "No"],
            "isActive": true,
            "endTime": "1767225600",
            "createdAt": "1764547200",
            "totalFunding": "2500000000000000000",
            "voteCount": "41",
            "creator": "0x00000000000000000000000000000000000000aa",
            "fundingToken": "0x0000000000000000000000000000000000000000"
        })
    }

    #[test]
    fn test_poll_mapping() {
        let raw: RawPoll = serde_json::from_value(raw_poll_json()).unwrap();
        let poll = Poll::try_from(raw).unwrap();

        assert_eq!(poll.id, 3);
        assert_eq!(poll.options.len(), 2);
        assert_eq!(poll.participant_count, 41);
        assert_eq!(poll.total_funding, U256::from(2_500_000_000_000_000_000u128));
        assert_eq!(poll.end_time.timestamp(), 1_767_225_600);
        assert_eq!(poll.created_at.map(|t| t.timestamp()), Some(1_764_547_200));
        assert!(poll.funding_token.is_none());
    }

    #[test]
    fn test_bad_bigint_is_mapping_error() {
        let mut value = raw_poll_json();
        value["totalFunding"] = json!("lots");
        let raw: RawPoll = serde_json::from_value(value).unwrap();

        match Poll::try_from(raw) {
            Err(SubgraphError::Mapping { field, value }) => {
                assert_eq!(field, "totalFunding");
                assert_eq!(value, "lots");
            }
            other => panic!("expected mapping error, got {:?}", other),
        }
    }

    #[test]
    fn test_vote_mapping() {
        let raw: RawVote = serde_json::from_value(json!({
            "id": "0xabc-1",
            "poll": { "pollId": "3" },
            "voter": "0x00000000000000000000000000000000000000bb",
            "optionIndex": "1",
            "timestamp": "1764550000"
        }))
        .unwrap();

        let vote = Vote::try_from(raw).unwrap();
        assert_eq!(vote.poll_id, 3);
        assert_eq!(vote.option_index, 1);
    }

    #[test]
    fn test_map_all_stops_on_error() {
        let good: RawDailyStats = serde_json::from_value(json!({
            "dayStartTimestamp": "1764547200",
            "pollsCreated": "2",
            "votesCast": "10",
            "fundingAmount": "0"
        }))
        .unwrap();
        let mut bad = good.clone();
        bad.votes_cast = "-1".to_string();

        let ok: Vec<DailyStats> = map_all(vec![good.clone()]).unwrap();
        assert_eq!(ok[0].votes_cast, 10);

        let err = map_all::<_, DailyStats>(vec![good, bad]);
        assert!(err.is_err());
    }
}
