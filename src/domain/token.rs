use serde::{Deserialize, Serialize};

/// A fungible token whose balance is probed for every tracked wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    /// Token contract address
    pub address: String,
    pub decimals: u8,
}

impl TokenConfig {
    pub fn new(symbol: &str, address: &str, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            address: address.to_string(),
            decimals,
        }
    }
}

/// Tokens tracked on Arbitrum One
pub fn default_tokens() -> Vec<TokenConfig> {
    vec![
        TokenConfig::new("USDC", "0xaf88d065e77c8cC2239327C5EDb3A432268e5831", 6),
        TokenConfig::new("USDT", "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9", 6),
        TokenConfig::new("WETH", "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", 18),
        TokenConfig::new("ARB", "0x912CE59144191C1204E64559FE8253a0e49E6548", 18),
    ]
}
