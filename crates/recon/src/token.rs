use thiserror::Error;

use crate::model::TokenDetails;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("rpc error: {code} {message}")]
    Rpc { code: i64, message: String },
    #[error("rpc endpoint unreachable: {0}")]
    Network(String),
    #[error("decode hex result: {0}")]
    Decode(String),
    #[error("decimals value too large")]
    TooLarge,
    #[error("token contract {0} not found")]
    NotFound(String),
}

/// Source of ERC-20 metadata for a contract address.
pub trait TokenMetadata {
    /// `Ok(None)` when the address holds no token contract.
    fn token_details(&self, contract: &str) -> Result<Option<TokenDetails>, TokenError>;
}

/// Look up `contract`, treating an absent token as an error.
pub fn require_token<M: TokenMetadata + ?Sized>(
    metadata: &M,
    contract: &str,
) -> Result<TokenDetails, TokenError> {
    let details = metadata
        .token_details(contract)?
        .ok_or_else(|| TokenError::NotFound(contract.to_string()))?;
    tracing::debug!(contract, decimals = details.decimals, name = %details.name, "token details");
    Ok(details)
}
