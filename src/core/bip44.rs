//! BIP44 derivation paths
//!
//! Path format: m/44'/coin_type'/account'/change/address_index
//!
//! The sweeper only ever walks the Ethereum external chain of account 0,
//! so `coin_type = 60`, `account = 0`, `change = 0` are fixed and only the
//! address index varies.

use std::fmt;

/// Hardened-index offset.
pub const HARDENED: u32 = 0x8000_0000;

/// SLIP-44 coin type for Ethereum.
pub const ETHEREUM_COIN_TYPE: u32 = 60;

/// BIP44 derivation path structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bip44Path {
    /// Cryptocurrency type (60=ETH)
    pub coin_type: u32,
    /// Account index
    pub account: u32,
    /// External/internal chain (0=external, 1=internal change)
    pub change: u32,
    /// Address index within the chain
    pub address_index: u32,
}

impl Bip44Path {
    /// Ethereum path for the given address index: m/44'/60'/0'/0/<index>
    pub fn ethereum(address_index: u32) -> Self {
        Self { coin_type: ETHEREUM_COIN_TYPE, account: 0, change: 0, address_index }
    }

    /// Complete derivation path indices
    pub fn to_indices(&self) -> [u32; 5] {
        [
            HARDENED | 44,              // purpose'
            HARDENED | self.coin_type,  // coin_type'
            HARDENED | self.account,    // account'
            self.change,                // change
            self.address_index,         // address_index
        ]
    }
}

impl fmt::Display for Bip44Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m/44'/{}'/{}'/{}/{}",
            self.coin_type, self.account, self.change, self.address_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bip44_path_indices() {
        let indices = Bip44Path::ethereum(0).to_indices();

        assert_eq!(indices[0], 0x8000002C); // 44'
        assert_eq!(indices[1], 0x8000003C); // 60'
        assert_eq!(indices[2], 0x80000000); // 0'
        assert_eq!(indices[3], 0);
        assert_eq!(indices[4], 0);
    }

    #[test]
    fn test_bip44_path_string() {
        assert_eq!(Bip44Path::ethereum(0).to_string(), "m/44'/60'/0'/0/0");
        assert_eq!(Bip44Path::ethereum(49).to_string(), "m/44'/60'/0'/0/49");
    }

    #[test]
    fn test_address_index_is_not_hardened() {
        let indices = Bip44Path::ethereum(7).to_indices();
        assert_eq!(indices[4], 7);
        assert_eq!(indices[4] & HARDENED, 0);
    }
}
