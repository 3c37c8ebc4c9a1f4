//! Contract call orchestration
//!
//! Sequences the two outbound calls of the transfer flow: an ERC-20
//! allowance approval authorizing the bridge to spend the source token, and
//! the bridge-transfer call itself. Amounts cross this boundary as
//! human-readable decimals and are converted to exact base units here using
//! the token registry.

use crate::config::{BridgeConfig, ChainConfig};
use crate::error::{BridgeError, BridgeResult};
use crate::tokens::{to_base_units, TokenRegistry};

use async_trait::async_trait;
use chrono::Utc;
use ethers::contract::abigen;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TxHash, U256};
use std::sync::Arc;
use tracing::{debug, info};

abigen!(
    Erc20Token,
    r#"[
        function approve(address spender, uint256 amount) external returns (bool)
        function balanceOf(address account) external view returns (uint256)
    ]"#
);

abigen!(
    BridgePay,
    r#"[
        function bridgeTransfer(address recipient, address sourceToken, address destinationToken, uint256 sourceAmount, uint256 minDestinationAmount, uint256 deadline) external
        function platformFee() external view returns (uint256)
        function poolFee() external view returns (uint24)
        function supportedTokens(address token) external view returns (bool)
    ]"#
);

type BridgeMiddleware = SignerMiddleware<Provider<Http>, LocalWallet>;

/// The two state-changing calls of the transfer flow. Behind a trait so the
/// workflow controller can be exercised without a chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractCalls: Send + Sync {
    /// Authorize the bridge contract to spend `amount` of the token on the
    /// wallet's behalf. Suspends until submission resolves or is rejected.
    async fn approve_allowance(&self, token: &str, amount: f64) -> BridgeResult<TxHash>;

    /// Submit the bridge transfer. `amount` is the source amount,
    /// `min_destination_amount` the slippage floor enforced on-chain.
    async fn execute_bridge_transfer(
        &self,
        recipient: &str,
        source_token: &str,
        destination_token: &str,
        amount: f64,
        min_destination_amount: f64,
    ) -> BridgeResult<TxHash>;
}

/// Contract client bound to the fixed bridge address, signing with the
/// locally held wallet
pub struct BridgeClient {
    client: Arc<BridgeMiddleware>,
    bridge_address: Address,
    registry: Arc<TokenRegistry>,
    deadline_secs: u64,
}

impl BridgeClient {
    /// Build the signing client from configuration
    pub fn connect(
        chain: &ChainConfig,
        bridge: &BridgeConfig,
        registry: Arc<TokenRegistry>,
    ) -> BridgeResult<Self> {
        let wallet = Self::load_wallet()?.with_chain_id(chain.chain_id);
        let wallet_address = wallet.address();

        let provider = Provider::<Http>::try_from(chain.rpc_url.as_str())
            .map_err(|e| BridgeError::Config(format!("Invalid RPC URL: {}", e)))?;

        let bridge_address: Address = bridge
            .contract_address
            .parse()
            .map_err(|e| BridgeError::Config(format!("Invalid bridge address: {}", e)))?;

        info!(
            "Contract client initialized for {} with wallet {:?}",
            chain.name, wallet_address
        );

        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            bridge_address,
            registry,
            deadline_secs: bridge.deadline_secs,
        })
    }

    /// Load the signing wallet from the environment
    fn load_wallet() -> BridgeResult<LocalWallet> {
        if let Ok(key) = std::env::var("BRIDGEPAY_PRIVATE_KEY") {
            return key
                .parse::<LocalWallet>()
                .map_err(|e| BridgeError::Wallet(format!("Invalid private key: {}", e)));
        }

        Err(BridgeError::Wallet(
            "No wallet configured. Set BRIDGEPAY_PRIVATE_KEY".to_string(),
        ))
    }

    /// Current platform fee held by the bridge contract
    pub async fn platform_fee(&self) -> BridgeResult<U256> {
        BridgePay::new(self.bridge_address, self.client.clone())
            .platform_fee()
            .call()
            .await
            .map_err(|e| BridgeError::ContractCall(e.to_string()))
    }

    /// Swap pool fee used by the bridge's router
    pub async fn pool_fee(&self) -> BridgeResult<u32> {
        BridgePay::new(self.bridge_address, self.client.clone())
            .pool_fee()
            .call()
            .await
            .map_err(|e| BridgeError::ContractCall(e.to_string()))
    }

    /// ERC-20 balance of `owner` for a registered token, in base units
    pub async fn token_balance(&self, token: &str, owner: Address) -> BridgeResult<U256> {
        let info = self.registry.resolve(token)?;
        Erc20Token::new(info.address, self.client.clone())
            .balance_of(owner)
            .call()
            .await
            .map_err(|e| BridgeError::ContractCall(e.to_string()))
    }

    fn parse_recipient(recipient: &str) -> BridgeResult<Address> {
        recipient.parse().map_err(|_| BridgeError::Validation {
            field: "destination_address".to_string(),
            message: "not a valid wallet address".to_string(),
        })
    }
}

#[async_trait]
impl ContractCalls for BridgeClient {
    async fn approve_allowance(&self, token: &str, amount: f64) -> BridgeResult<TxHash> {
        let info = self.registry.resolve(token)?;
        let base_amount = to_base_units(amount, info.decimals)?;

        debug!(
            "Approving {} {} ({} base units) for bridge spend",
            amount, token, base_amount
        );

        let erc20 = Erc20Token::new(info.address, self.client.clone());
        let call = erc20.approve(self.bridge_address, base_amount);
        let pending = call
            .send()
            .await
            .map_err(|e| BridgeError::ContractCall(format!("approve: {}", e)))?;

        let tx_hash = *pending;
        info!("Allowance approval submitted for {}: {:?}", token, tx_hash);
        Ok(tx_hash)
    }

    async fn execute_bridge_transfer(
        &self,
        recipient: &str,
        source_token: &str,
        destination_token: &str,
        amount: f64,
        min_destination_amount: f64,
    ) -> BridgeResult<TxHash> {
        let source = self.registry.resolve(source_token)?;
        let destination = self.registry.resolve(destination_token)?;
        let recipient = Self::parse_recipient(recipient)?;

        let source_amount = to_base_units(amount, source.decimals)?;
        let min_amount = to_base_units(min_destination_amount, destination.decimals)?;
        let deadline = U256::from(Utc::now().timestamp() as u64 + self.deadline_secs);

        debug!(
            "Bridge transfer {} {} -> {} (min {}), deadline {}",
            amount, source_token, destination_token, min_destination_amount, deadline
        );

        let bridge = BridgePay::new(self.bridge_address, self.client.clone());
        let call = bridge.bridge_transfer(
            recipient,
            source.address,
            destination.address,
            source_amount,
            min_amount,
            deadline,
        );
        let pending = call
            .send()
            .await
            .map_err(|e| BridgeError::ContractCall(format!("bridgeTransfer: {}", e)))?;

        let tx_hash = *pending;
        info!(
            "Bridge transfer submitted {} -> {}: {:?}",
            source_token, destination_token, tx_hash
        );
        Ok(tx_hash)
    }
}
