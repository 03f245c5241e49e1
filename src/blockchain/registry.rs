//! Fixed, ordered list of RPC endpoints.
//!
//! Position `i` is permanently paired with derived account `i`. The list is
//! never mutated, health-checked or reordered, and an endpoint is never used
//! for any index other than its own.

use crate::core::errors::SweepError;

/// Public Ethereum mainnet endpoints, one per derived account.
pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://eth.llamarpc.com",
    "https://rpc.ankr.com/eth",
    "https://ethereum.publicnode.com",
    "https://1rpc.io/eth",
    "https://eth-mainnet.public.blastapi.io",
    "https://rpc.flashbots.net",
    "https://cloudflare-eth.com",
    "https://eth-mainnet.gateway.pokt.network/v1/5f3453978e354ab992c4da79",
    "https://api.mycryptoapi.com/eth",
    "https://rpc.eth.gateway.fm",
    "https://eth-mainnet-public.unifra.io",
    "https://ethereum.blockpi.network/v1/rpc/public",
    "https://rpc.payload.de",
    "https://api.zmok.io/mainnet/oaen6dy8ff6hju9k",
    "https://eth.api.onfinality.io/public",
    "https://core.gashawk.io/rpc",
    "https://rpc.builder0x69.io",
    "https://eth.meowrpc.com",
    "https://eth.drpc.org",
    "https://mainnet.gateway.tenderly.co",
    "https://rpc.mevblocker.io",
    "https://rpc.mevblocker.io/noreverts",
    "https://rpc.mevblocker.io/fast",
    "https://eth-mainnet.rpcfast.com",
    "https://api.securerpc.com/v1",
    "https://openapi.bitstack.com/v1/wNFxbiJyQsSeLrX",
    "https://eth-rpc.gateway.pokt.network",
    "https://ethereum-mainnet.gateway.tatum.io",
    "https://api.zan.top/node/v1/eth/mainnet/public",
    "https://eth-mainnet.nodereal.io/v1/1659dfb40aa2",
    "https://eth.merkle.io",
    "https://rpc.notadegen.com/eth",
    "https://eth.gateway.tenderly.co",
    "https://virginia.rpc.blxrbdn.com",
    "https://uk.rpc.blxrbdn.com",
    "https://singapore.rpc.blxrbdn.com",
    "https://eth.rpc.blxrbdn.com",
    "https://eth-mainnet.diamondswap.org/rpc",
    "https://rpc.lokibuilder.xyz/eth",
    "https://rpc.flashbots.net/fast",
    "https://rpc.flashbots.net/builder",
    "https://rpc.lightspeedbuilder.info",
    "https://rpc.titanbuilder.xyz",
    "https://rpc.beaverbuild.org",
    "https://eth.getblock.io/mainnet/",
    "https://mainnet.eth.cloud.ava.do",
    "https://eth.connect.bloq.cloud/v1/",
    "https://nodes.mewapi.io/rpc/eth",
    "https://main-light.eth.linkpool.io",
    "https://eth-mainnet.zerion.io",
];

/// One network provider reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub index: usize,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
}

impl EndpointRegistry {
    /// Build a registry from an ordered list of URLs.
    pub fn new<I, S>(urls: I) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| {
                let url = url.as_ref().trim();
                reqwest::Url::parse(url).map_err(|e| {
                    SweepError::Config(format!("Invalid endpoint #{} '{}': {}", index, url, e))
                })?;
                Ok(Endpoint { index, url: url.to_string() })
            })
            .collect::<Result<Vec<_>, SweepError>>()?;

        if endpoints.is_empty() {
            return Err(SweepError::Config("Endpoint registry must not be empty".to_string()));
        }
        Ok(Self { endpoints })
    }

    pub fn endpoint_at(&self, index: usize) -> Option<&Endpoint> {
        self.endpoints.get(index)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS
                .iter()
                .enumerate()
                .map(|(index, url)| Endpoint { index, url: (*url).to_string() })
                .collect(),
        }
    }
}
