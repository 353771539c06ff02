//! Contract Access Layer
//!
//! Direct reads of the deployed polls contract through an injected
//! [`Provider`]. Only point lookups are cheap here: owner, per-poll
//! fields, vote flags and token balances. Aggregate, historical and
//! filtered questions belong to the subgraph.

mod abi;
#[cfg(test)]
pub(crate) mod mock;
mod provider;
mod reader;

pub use abi::{IPollsContract, IERC20};
pub use provider::{HttpProvider, Provider};
pub use reader::{Erc20, PollsContract};

use crate::config::ContractConfig;
use alloy_primitives::Address;
use std::sync::Arc;
use thiserror::Error;

/// Build a polls contract reader for `chain_id` from configuration
pub fn connect(config: &ContractConfig, chain_id: u64) -> Result<PollsContract, ContractError> {
    let deployment = config
        .deployment(chain_id)
        .ok_or(ContractError::NotDeployed(chain_id))?;

    let address: Address = deployment
        .address
        .as_deref()
        .ok_or(ContractError::NotDeployed(chain_id))?
        .parse()
        .map_err(|_| {
            ContractError::InvalidAddress(deployment.address.clone().unwrap_or_default())
        })?;

    let provider = HttpProvider::new(&deployment.rpc_url, config.request_timeout_secs)?;
    tracing::debug!(chain_id, %address, rpc_url = %deployment.rpc_url, "Contract reader ready");

    Ok(PollsContract::new(Arc::new(provider), address))
}

/// Errors that can occur when reading from the chain
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Polls contract not deployed on chain {0}")]
    NotDeployed(u64),

    #[error("Invalid contract address: {0}")]
    InvalidAddress(String),

    #[error("Connected to chain {actual}, expected {expected}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("RPC unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("RPC HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("ABI error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Value out of range for {0}")]
    Overflow(&'static str),
}
