//! GraphQL documents and variable builders
//!
//! Every listing orders by creation time, newest first, and is windowed
//! with `first` / `skip`.

use crate::models::{PageRequest, PollFilter};
use serde_json::{json, Map, Value};

const POLL_FIELDS: &str = r#"
    id
    pollId
    question
    options
    isActive
    endTime
    createdAt
    totalFunding
    voteCount
    creator
    fundingToken
"#;

pub fn polls_query() -> String {
    format!(
        r#"query Polls($first: Int!, $skip: Int!, $where: Poll_filter) {{
  polls(first: $first, skip: $skip, orderBy: createdAt, orderDirection: desc, where: $where) {{{}}}
}}"#,
        POLL_FIELDS
    )
}

pub fn poll_query() -> String {
    format!(
        r#"query Poll($id: ID!) {{
  poll(id: $id) {{{}}}
}}"#,
        POLL_FIELDS
    )
}

pub const FUNDINGS_QUERY: &str = r#"query Fundings($poll: String!, $first: Int!, $skip: Int!) {
  fundings(first: $first, skip: $skip, orderBy: timestamp, orderDirection: desc, where: { poll: $poll }) {
    id
    poll { pollId }
    token
    amount
    funder
    timestamp
    transactionHash
  }
}"#;

pub const DISTRIBUTIONS_QUERY: &str = r#"query Distributions($poll: String!, $first: Int!, $skip: Int!) {
  distributions(first: $first, skip: $skip, orderBy: timestamp, orderDirection: desc, where: { poll: $poll }) {
    id
    poll { pollId }
    recipient
    token
    amount
    timestamp
    eventType
  }
}"#;

pub const CLAIMS_QUERY: &str = r#"query Claims($claimer: Bytes!, $first: Int!, $skip: Int!) {
  claims(first: $first, skip: $skip, orderBy: timestamp, orderDirection: desc, where: { claimer: $claimer }) {
    id
    poll { pollId }
    claimer
    token
    amount
    timestamp
  }
}"#;

/// Votes on a poll, oldest first so dedup keeps each voter's first vote
pub const POLL_VOTES_QUERY: &str = r#"query PollVotes($poll: String!, $first: Int!, $skip: Int!) {
  votes(first: $first, skip: $skip, orderBy: timestamp, orderDirection: asc, where: { poll: $poll }) {
    id
    poll { pollId }
    voter
    optionIndex
    timestamp
  }
}"#;

pub const VOTER_VOTES_QUERY: &str = r#"query VoterVotes($voter: Bytes!, $first: Int!, $skip: Int!) {
  votes(first: $first, skip: $skip, orderBy: timestamp, orderDirection: desc, where: { voter: $voter }) {
    poll { pollId }
  }
}"#;

pub const GLOBAL_STATS_QUERY: &str = r#"query GlobalStats {
  globalStats(id: "global") {
    totalPolls
    totalVotes
    totalFunding
    totalDistributed
    uniqueVoters
    uniqueFunders
  }
}"#;

pub const DAILY_STATS_QUERY: &str = r#"query DailyStats($first: Int!) {
  dailyStats(first: $first, orderBy: dayStartTimestamp, orderDirection: desc) {
    dayStartTimestamp
    pollsCreated
    votesCast
    fundingAmount
  }
}"#;

/// `Poll_filter` object for the optional predicates; `null` when empty
pub fn poll_filter(filter: &PollFilter) -> Value {
    let mut map = Map::new();
    if let Some(active) = filter.is_active {
        map.insert("isActive".to_string(), Value::Bool(active));
    }
    if let Some(creator) = &filter.creator {
        // Bytes filters compare lowercase hex
        map.insert(
            "creator".to_string(),
            Value::String(creator.to_string().to_lowercase()),
        );
    }

    if map.is_empty() {
        Value::Null
    } else {
        Value::Object(map)
    }
}

pub fn page_variables(page: PageRequest) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("first".to_string(), json!(page.first));
    map.insert("skip".to_string(), json!(page.skip));
    map
}
