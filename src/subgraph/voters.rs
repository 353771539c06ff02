//! Voter deduplication for bulk operations (reward distribution lists)

use crate::models::Vote;
use alloy_primitives::Address;
use std::collections::HashSet;

/// Keep only the first vote of each address per poll, preserving order.
///
/// `Address` compares bytes, so checksummed and lowercase inputs collapse.
pub fn dedup_voters(votes: &[Vote]) -> Vec<Vote> {
    let mut seen: HashSet<(u64, Address)> = HashSet::new();
    votes
        .iter()
        .filter(|v| seen.insert((v.poll_id, v.voter)))
        .cloned()
        .collect()
}

/// Unique voter addresses of one poll, in first-vote order
pub fn unique_voters(votes: &[Vote], poll_id: u64) -> Vec<Address> {
    dedup_voters(votes)
        .into_iter()
        .filter(|v| v.poll_id == poll_id)
        .map(|v| v.voter)
        .collect()
}

/// Append a further page of votes to `loaded`, dropping votes whose
/// voter already appears for that poll. Returns how many were appended.
pub fn merge_voters(loaded: &mut Vec<Vote>, page: Vec<Vote>) -> usize {
    let mut seen: HashSet<(u64, Address)> = loaded.iter().map(|v| (v.poll_id, v.voter)).collect();
    let before = loaded.len();
    loaded.extend(page.into_iter().filter(|v| seen.insert((v.poll_id, v.voter))));
    loaded.len() - before
}
