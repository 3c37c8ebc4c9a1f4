//! Configuration management for the BridgePay service
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    pub price_api: PriceApiConfig,
    pub chain: ChainConfig,
    pub bridge: BridgeConfig,
    /// Supported token registry, symbol -> entry. Empty means "use the
    /// built-in defaults" (see `tokens::TokenRegistry::builtin`).
    #[serde(default)]
    pub tokens: HashMap<String, TokenEntry>,
    /// Selectable destination networks
    #[serde(default = "default_networks")]
    pub networks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceApiConfig {
    /// Base URL of the spot-price API, e.g. https://api.coingecko.com/api/v3
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Address of the deployed BridgePay contract (0x-prefixed)
    pub contract_address: String,
    /// Slippage tolerance in basis points; the min-destination floor is
    /// (10000 - slippage_bps) / 10000 of the nominal amount
    pub slippage_bps: u64,
    /// Extra allowance approved on top of the estimated source amount, in
    /// basis points
    pub approval_buffer_bps: u64,
    /// Bridge transfer deadline, seconds from submission
    pub deadline_secs: u64,
    /// Minimum accepted destination amount on the form
    pub min_amount: f64,
}

/// One token registry entry
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    /// On-chain address, hex without 0x prefix
    pub address: String,
    pub decimals: u8,
    /// Identifier on the price API; tokens without one cannot be priced
    pub price_id: Option<String>,
}

fn default_networks() -> Vec<String> {
    vec!["BNB".to_string(), "Arbitrum".to_string(), "Manta".to_string()]
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("BRIDGEPAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.bridge.contract_address.is_empty() {
            anyhow::bail!("Bridge contract address is not configured");
        }

        if self.bridge.slippage_bps >= 10_000 {
            anyhow::bail!(
                "Slippage of {} bps would zero the destination floor",
                self.bridge.slippage_bps
            );
        }

        if self.bridge.min_amount <= 0.0 {
            anyhow::bail!("Minimum amount must be positive");
        }

        if self.chain.rpc_url.is_empty() {
            anyhow::bail!("Chain {} has no RPC URL configured", self.chain.name);
        }

        for (symbol, entry) in &self.tokens {
            let bytes = hex::decode(&entry.address)
                .with_context(|| format!("Token {} has a non-hex address", symbol))?;
            if bytes.len() != 20 {
                anyhow::bail!("Token {} address is not 20 bytes", symbol);
            }
            if entry.price_id.is_none() {
                tracing::warn!("Token {} has no price id - estimates will fail for it", symbol);
            }
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
