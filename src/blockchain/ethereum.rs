use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, JsonRpcClient, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, TransactionRequest, TxHash, U256, U64},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::registry::EndpointRegistry;
use super::traits::{ChainProvider, TransactionStatus, TRANSFER_GAS_UNITS};
use crate::core::domain::PrivateKey;
use crate::core::errors::SweepError;

#[derive(Clone)]
pub struct EthereumClient<P: JsonRpcClient + Clone = Http> {
    provider: Provider<P>,
    endpoint: String,
    chain_id: u64,
}

impl EthereumClient<Http> {
    /// Build an HTTP client for `rpc_url`. Makes no network call, so an
    /// endpoint that is down at startup only fails its own sweeps later.
    pub fn connect(rpc_url: &str, chain_id: u64, request_timeout: Duration) -> Result<Self, SweepError> {
        let rpc_url_clean = rpc_url.trim();
        let parsed_url = reqwest::Url::parse(rpc_url_clean).map_err(|e| {
            SweepError::ProviderUnavailable(format!("Invalid RPC URL '{}': {}", rpc_url_clean, e))
        })?;

        // Allow proxy environment vars.
        let mut builder = reqwest::Client::builder().timeout(request_timeout);
        if let Ok(proxy) = std::env::var("HTTPS_PROXY").or_else(|_| std::env::var("HTTP_PROXY")) {
            if let Ok(p) = reqwest::Proxy::all(proxy) {
                builder = builder.proxy(p);
            }
        }
        let client = builder.build().map_err(|e| {
            SweepError::ProviderUnavailable(format!("Failed to build HTTP client: {}", e))
        })?;

        let provider = Provider::new(Http::new_with_client(parsed_url, client));
        debug!(endpoint = rpc_url_clean, chain_id, "Prepared Ethereum client");

        Ok(Self { provider, endpoint: rpc_url_clean.to_string(), chain_id })
    }

    /// One client per registry entry, in registry order.
    pub fn connect_registry(
        registry: &EndpointRegistry,
        chain_id: u64,
        request_timeout: Duration,
    ) -> Result<Vec<Arc<dyn ChainProvider>>, SweepError> {
        registry
            .iter()
            .map(|endpoint| {
                let client = Self::connect(&endpoint.url, chain_id, request_timeout)?;
                Ok(Arc::new(client) as Arc<dyn ChainProvider>)
            })
            .collect()
    }
}

impl<P> EthereumClient<P>
where
    P: JsonRpcClient + Clone + Send + Sync,
{
    /// Creates a client over an existing provider. Useful with `MockProvider`.
    pub fn new_with_provider(provider: Provider<P>, chain_id: u64) -> EthereumClient<P> {
        EthereumClient { provider, endpoint: "mock".to_string(), chain_id }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn create_wallet(&self, private_key: &PrivateKey) -> Result<LocalWallet, SweepError> {
        // Do NOT log key material.
        let wallet = private_key
            .with_secret(|pk_bytes| LocalWallet::from_bytes(pk_bytes))
            .map_err(|e| SweepError::TransferSubmission(format!("Invalid private key: {}", e)))?;
        Ok(wallet.with_chain_id(self.chain_id))
    }
}

#[async_trait]
impl<P> ChainProvider for EthereumClient<P>
where
    P: JsonRpcClient + Clone + 'static + Send + Sync,
{
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_balance(&self, address: Address) -> Result<U256, SweepError> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| SweepError::BalanceQuery(format!("{}: {}", self.endpoint, e)))
    }

    async fn get_fee_rate(&self) -> Result<U256, SweepError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| SweepError::FeeQuery(format!("{}: {}", self.endpoint, e)))
    }

    async fn submit_transfer(
        &self,
        private_key: &PrivateKey,
        to: Address,
        amount: U256,
        gas_price: U256,
    ) -> Result<TxHash, SweepError> {
        let wallet = self.create_wallet(private_key)?;
        let from = wallet.address();

        let nonce = self.provider.get_transaction_count(from, None).await.map_err(|e| {
            SweepError::TransferSubmission(format!("Failed to get nonce: {}", e))
        })?;
        debug!(nonce = %nonce, gas_price = %gas_price, "Prepared transfer");

        // Legacy transaction so the fee charged is exactly gas_price * gas.
        let tx = TransactionRequest::new()
            .from(from)
            .to(to)
            .value(amount)
            .gas(TRANSFER_GAS_UNITS)
            .gas_price(gas_price)
            .nonce(nonce)
            .chain_id(self.chain_id);

        let client = SignerMiddleware::new(self.provider.clone(), wallet);
        let pending_tx = client.send_transaction(tx, None).await.map_err(|e| {
            SweepError::TransferSubmission(format!("Failed to send transaction: {}", e))
        })?;

        let tx_hash = pending_tx.tx_hash();
        info!(tx_hash = ?tx_hash, endpoint = %self.endpoint, "Transaction sent");
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        poll_interval: Duration,
    ) -> Result<TransactionStatus, SweepError> {
        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    let status = if receipt.status == Some(U64::from(1)) {
                        TransactionStatus::Confirmed
                    } else {
                        TransactionStatus::Failed
                    };
                    debug!(tx_hash = ?tx_hash, status = ?status, "Receipt received");
                    return Ok(status);
                }
                // not mined yet
                Ok(None) => tokio::time::sleep(poll_interval).await,
                Err(e) => {
                    return Err(SweepError::Confirmation(format!(
                        "Failed to get receipt for {:?}: {}",
                        tx_hash, e
                    )))
                }
            }
        }
    }
}
