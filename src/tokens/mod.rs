//! Supported token registry
//!
//! Static symbol -> {address, decimals, price id} mapping consulted for every
//! amount-unit conversion and contract call argument. Loaded once at process
//! start, either from configuration or from the built-in defaults.

use crate::config::TokenEntry;
use crate::error::{BridgeError, BridgeResult};

use ethers::types::{Address, U256};
use ethers::utils::parse_units;
use serde::Serialize;
use std::collections::HashMap;

/// A registered token
#[derive(Debug, Clone, Serialize)]
pub struct TokenInfo {
    pub symbol: String,
    /// ERC-20 contract address
    #[serde(serialize_with = "serialize_address")]
    pub address: Address,
    pub decimals: u8,
}

fn serialize_address<S: serde::Serializer>(addr: &Address, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:#x}", addr))
}

/// Symbol -> token registry plus the symbol -> price-identifier mapping.
///
/// The two maps are distinct on purpose: a symbol can be priceable without
/// being bridgeable (ETH has a price id but no ERC-20 entry).
pub struct TokenRegistry {
    tokens: HashMap<String, TokenInfo>,
    price_ids: HashMap<String, String>,
}

impl TokenRegistry {
    /// Built-in registry matching the deployed bridge's supported set
    pub fn builtin() -> Self {
        let mut registry = Self {
            tokens: HashMap::new(),
            price_ids: HashMap::new(),
        };

        registry.insert_token("WETH", "fFf9976782d46CC05630D1f6eBAb18b2324d6B14", 18);
        registry.insert_token("USDC", "1c7D4B196Cb0C7B01d743Fbc6116a902379C7238", 6);

        registry.price_ids.insert("ETH".to_string(), "ethereum".to_string());
        registry.price_ids.insert("WETH".to_string(), "weth".to_string());
        registry.price_ids.insert("USDC".to_string(), "usd-coin".to_string());

        registry
    }

    /// Build from configured entries, falling back to the built-in set when
    /// none are configured. The built-in price ids are always seeded so ETH
    /// stays priceable even under a custom token set.
    pub fn from_config(entries: &HashMap<String, TokenEntry>) -> BridgeResult<Self> {
        if entries.is_empty() {
            return Ok(Self::builtin());
        }

        let mut registry = Self {
            tokens: HashMap::new(),
            price_ids: Self::builtin().price_ids,
        };

        for (symbol, entry) in entries {
            let address = format!("0x{}", entry.address)
                .parse::<Address>()
                .map_err(|e| {
                    BridgeError::Config(format!("token {} has invalid address: {}", symbol, e))
                })?;

            registry.tokens.insert(
                symbol.clone(),
                TokenInfo {
                    symbol: symbol.clone(),
                    address,
                    decimals: entry.decimals,
                },
            );

            if let Some(price_id) = &entry.price_id {
                registry.price_ids.insert(symbol.clone(), price_id.clone());
            }
        }

        Ok(registry)
    }

    fn insert_token(&mut self, symbol: &str, address_hex: &str, decimals: u8) {
        let address = format!("0x{}", address_hex)
            .parse::<Address>()
            .expect("builtin token address");
        self.tokens.insert(
            symbol.to_string(),
            TokenInfo {
                symbol: symbol.to_string(),
                address,
                decimals,
            },
        );
    }

    /// Resolve a symbol to its registry entry, failing for unknown tokens
    pub fn resolve(&self, symbol: &str) -> BridgeResult<&TokenInfo> {
        self.tokens.get(symbol).ok_or_else(|| BridgeError::UnsupportedToken {
            token: symbol.to_string(),
        })
    }

    /// Price-API identifier for a symbol, if it has one
    pub fn price_id(&self, symbol: &str) -> Option<&str> {
        self.price_ids.get(symbol).map(String::as_str)
    }

    /// All registered tokens, for the API listing
    pub fn all(&self) -> Vec<&TokenInfo> {
        let mut tokens: Vec<_> = self.tokens.values().collect();
        tokens.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        tokens
    }
}

/// Convert a human-readable decimal amount to exact integer base units.
///
/// The amount is first rendered to its shortest decimal form, the fraction is
/// truncated to the token's precision, and the result parsed as an exact
/// integer - no floating remainder survives the conversion.
pub fn to_base_units(amount: f64, decimals: u8) -> BridgeResult<U256> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(BridgeError::Internal(format!(
            "cannot convert amount {} to base units",
            amount
        )));
    }

    let rendered = amount.to_string();
    let (whole, fraction) = match rendered.split_once('.') {
        Some((w, f)) => (w, f),
        None => (rendered.as_str(), ""),
    };

    let fraction = &fraction[..fraction.len().min(decimals as usize)];
    let trimmed = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    };

    let parsed = parse_units(trimmed.as_str(), u32::from(decimals))
        .map_err(|e| BridgeError::Internal(format!("amount conversion failed: {}", e)))?;
    Ok(parsed.into())
}
