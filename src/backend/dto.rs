//! Backend request/response DTOs

use crate::backend::BackendError;
use crate::models::GlobalStats;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Responses arrive either bare or wrapped as `{ "data": ... }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

/// Error body returned on non-2xx responses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(alias = "message")]
    pub error: String,
}

// ============================================
// Analytics
// ============================================

/// `GET /api/analytics/stats`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsStats {
    pub total_polls: u64,
    pub total_votes: u64,
    /// Wei as a decimal string
    pub total_funding: String,
    #[serde(default)]
    pub total_distributed: Option<String>,
    #[serde(default)]
    pub unique_voters: u64,
    #[serde(default)]
    pub unique_funders: u64,
}

impl TryFrom<AnalyticsStats> for GlobalStats {
    type Error = BackendError;

    fn try_from(raw: AnalyticsStats) -> Result<Self, Self::Error> {
        let parse = |field: &str, value: &str| {
            U256::from_str_radix(value.trim(), 10)
                .map_err(|_| BackendError::Decode(format!("invalid {}: {}", field, value)))
        };

        Ok(GlobalStats {
            total_polls: raw.total_polls,
            total_votes: raw.total_votes,
            total_funding: parse("totalFunding", &raw.total_funding)?,
            total_distributed: match raw.total_distributed.as_deref() {
                Some(v) => parse("totalDistributed", v)?,
                None => U256::ZERO,
            },
            unique_voters: raw.unique_voters,
            unique_funders: raw.unique_funders,
        })
    }
}

/// One row of `GET /api/analytics/leaderboard`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub address: String,
    pub points: u64,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub polls_voted: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
}

// ============================================
// Participant (points, XP, quests)
// ============================================

/// `GET /api/participant/{address}/points`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPoints {
    pub address: String,
    pub points: u64,
    pub xp: u64,
    pub level: u32,
    #[serde(default)]
    pub streak_days: u32,
    /// XP still needed for the next level
    #[serde(default)]
    pub xp_to_next_level: Option<u64>,
}

/// A quest and the participant's progress on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub xp_reward: u64,
    #[serde(default)]
    pub points_reward: u64,
    pub progress: u64,
    pub target: u64,
    pub completed: bool,
    #[serde(default)]
    pub claimed: bool,
}

impl Quest {
    pub fn is_claimable(&self) -> bool {
        self.completed && !self.claimed
    }

    /// Progress as a fraction in `[0, 1]`
    pub fn completion(&self) -> f64 {
        if self.target == 0 {
            return if self.completed { 1.0 } else { 0.0 };
        }
        (self.progress as f64 / self.target as f64).min(1.0)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestsResponse {
    pub quests: Vec<Quest>,
}

/// `POST /api/participant/{address}/quests/{id}/claim`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestClaim {
    pub quest_id: String,
    pub xp_awarded: u64,
    #[serde(default)]
    pub points_awarded: u64,
}

// ============================================
// Feedback
// ============================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackReceipt {
    pub id: String,
}

// ============================================
// SideShift
// ============================================

/// A supported SideShift conversion pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideShiftPair {
    pub deposit_coin: String,
    pub settle_coin: String,
    pub min: String,
    pub max: String,
    pub rate: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PairsResponse {
    pub pairs: Vec<SideShiftPair>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideShiftQuoteRequest {
    pub deposit_coin: String,
    pub settle_coin: String,
    pub deposit_amount: String,
    pub settle_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideShiftQuote {
    pub id: String,
    pub deposit_amount: String,
    pub settle_amount: String,
    pub rate: String,
    pub expires_at: String,
}

// ============================================
// Gas
// ============================================

/// `GET /api/gas/price`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPrice {
    pub base_fee_gwei: f64,
    pub priority_fee_gwei: f64,
    #[serde(default)]
    pub estimated_vote_cost_eth: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_accepts_both_shapes() {
        let wrapped: Envelope<GasPrice> = serde_json::from_value(json!({
            "success": true,
            "data": { "baseFeeGwei": 0.05, "priorityFeeGwei": 0.001 }
        }))
        .unwrap();
        assert_eq!(wrapped.into_inner().base_fee_gwei, 0.05);

        let bare: Envelope<GasPrice> = serde_json::from_value(json!({
            "baseFeeGwei": 0.07, "priorityFeeGwei": 0.002, "estimatedVoteCostEth": 0.00001
        }))
        .unwrap();
        assert_eq!(bare.into_inner().estimated_vote_cost_eth, Some(0.00001));
    }

    #[test]
    fn test_analytics_stats_to_global() {
        let raw: AnalyticsStats = serde_json::from_value(json!({
            "totalPolls": 12,
            "totalVotes": 340,
            "totalFunding": "5000000000000000000",
            "uniqueVoters": 90
        }))
        .unwrap();

        let stats = GlobalStats::try_from(raw).unwrap();
        assert_eq!(stats.total_polls, 12);
        assert_eq!(stats.total_funding, U256::from(5_000_000_000_000_000_000u128));
        assert_eq!(stats.total_distributed, U256::ZERO);
        assert_eq!(stats.unique_funders, 0);
    }

    #[test]
    fn test_quest_progress() {
        let quest: Quest = serde_json::from_value(json!({
            "id": "vote-5",
            "title": "Vote on 5 polls",
            "xpReward": 50,
            "progress": 7,
            "target": 5,
            "completed": true
        }))
        .unwrap();

        assert!(quest.is_claimable());
        assert_eq!(quest.completion(), 1.0);
    }

    #[test]
    fn test_error_body_alias() {
        let body: ErrorBody = serde_json::from_value(json!({ "message": "nope" })).unwrap();
        assert_eq!(body.error, "nope");
    }
}
