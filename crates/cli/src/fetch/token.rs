//! ERC-20 metadata over JSON-RPC `eth_call`.

use alloy_primitives::U256;
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};

use walletsync_recon::token::{TokenError, TokenMetadata};
use walletsync_recon::TokenDetails;

use super::common::FetchClient;

sol! {
    // Decoded wide so oversized values are reported instead of truncated.
    function decimals() external view returns (uint256);
    function name() external view returns (string);
}

const WORD: usize = 32;

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (CallParams<'a>, &'static str),
}

#[derive(Debug, Serialize)]
struct CallParams<'a> {
    to: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

fn extract_rpc_error(body: &serde_json::Value, status: u16) -> String {
    body["error"]["message"]
        .as_str()
        .unwrap_or(&format!("HTTP {}", status))
        .to_string()
}

// ── Client ──────────────────────────────────────────────────────────

pub struct TokenClient {
    client: FetchClient,
    rpc_url: String,
}

impl TokenClient {
    pub fn new(rpc_url: String) -> Result<Self, TokenError> {
        Ok(Self {
            client: FetchClient::new("RPC", extract_rpc_error)?,
            rpc_url,
        })
    }

    /// Raw `eth_call` result bytes, or None for an empty result.
    fn eth_call<C: SolCall>(&self, contract: &str, call: &C) -> Result<Option<Vec<u8>>, TokenError> {
        let data = format!("0x{}", hex::encode(call.abi_encode()));
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "eth_call",
            params: (CallParams { to: contract, data }, "latest"),
        };
        let resp: RpcResponse = self
            .client
            .send_typed(|http| http.post(&self.rpc_url).json(&request))?;

        if let Some(err) = resp.error {
            return Err(TokenError::Rpc { code: err.code, message: err.message });
        }
        decode_hex_result(resp.result.as_deref().unwrap_or(""))
    }
}

impl TokenMetadata for TokenClient {
    fn token_details(&self, contract: &str) -> Result<Option<TokenDetails>, TokenError> {
        let Some(raw) = self.eth_call(contract, &decimalsCall {})? else {
            return Ok(None);
        };
        let decimals = decode_decimals(&raw)?;

        // A missing or undecodable name is not fatal.
        let name = match self.eth_call(contract, &nameCall {}) {
            Ok(Some(raw)) => decode_name(&raw),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(contract, %err, "cannot read token name");
                None
            }
        };

        Ok(Some(TokenDetails {
            decimals,
            name: name.unwrap_or_else(|| contract.to_string()),
        }))
    }
}

// ── ABI decoding ────────────────────────────────────────────────────

fn decode_hex_result(result: &str) -> Result<Option<Vec<u8>>, TokenError> {
    let digits = result.trim().trim_start_matches("0x").trim_start_matches("0X");
    if digits.is_empty() {
        return Ok(None);
    }
    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{digits}");
        padded.as_str()
    } else {
        digits
    };
    hex::decode(digits)
        .map(Some)
        .map_err(|e| TokenError::Decode(e.to_string()))
}

fn decode_decimals(raw: &[u8]) -> Result<u8, TokenError> {
    // Some nodes return a short result; it is right-aligned in one word.
    let mut word = [0u8; WORD];
    let raw = if raw.len() < WORD {
        word[WORD - raw.len()..].copy_from_slice(raw);
        &word[..]
    } else {
        raw
    };
    let value: U256 = decimalsCall::abi_decode_returns(raw, true)
        .map_err(|e| TokenError::Decode(e.to_string()))?
        ._0;
    u8::try_from(value).map_err(|_| TokenError::TooLarge)
}

/// ABI `string`, falling back to a NUL-padded `bytes32` for older tokens.
fn decode_name(raw: &[u8]) -> Option<String> {
    let text = match nameCall::abi_decode_returns(raw, true) {
        Ok(ret) => ret._0,
        Err(_) if raw.len() == WORD => {
            String::from_utf8_lossy(raw).trim_end_matches('\0').to_string()
        }
        Err(err) => {
            tracing::debug!(%err, "undecodable token name");
            return None;
        }
    };
    (!text.is_empty()).then_some(text)
}
