//! Network configuration
//!
//! Identifiers, fees and limits for one network, with presets for the public
//! networks and a local test network. Loadable from and savable to JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{ChainKind, Id};
use crate::selection::DEFAULT_GOOSE_EGG_CAP;

/// Base units per whole AVAX
pub const NANO_AVAX_PER_AVAX: u64 = 1_000_000_000;
/// Addresses derived per discovery round
pub const DEFAULT_DISCOVERY_CHUNK: u32 = 20;
/// UTXOs requested per page
pub const DEFAULT_UTXO_PAGE_LIMIT: u32 = 1024;

pub const MAINNET_ID: u32 = 1;
pub const FUJI_ID: u32 = 5;
pub const LOCAL_ID: u32 = 12345;

const MAINNET_X: Id = Id::new([
    0xed, 0x5f, 0x38, 0x34, 0x1e, 0x43, 0x6e, 0x5d,
    0x46, 0xe2, 0xbb, 0x00, 0xb4, 0x5d, 0x62, 0xae,
    0x97, 0xd1, 0xb0, 0x50, 0xc6, 0x4b, 0xc6, 0x34,
    0xae, 0x10, 0x62, 0x67, 0x39, 0xe3, 0x5c, 0x4b,
]);
const MAINNET_C: Id = Id::new([
    0x04, 0x27, 0xd4, 0xb2, 0x2a, 0x2a, 0x78, 0xbc,
    0xdd, 0xd4, 0x56, 0x74, 0x2c, 0xaf, 0x91, 0xb5,
    0x6b, 0xad, 0xbf, 0xf9, 0x85, 0xee, 0x19, 0xae,
    0xf1, 0x45, 0x73, 0xe7, 0x34, 0x3f, 0xd6, 0x52,
]);
const MAINNET_AVAX: Id = Id::new([
    0x21, 0xe6, 0x73, 0x17, 0xcb, 0xc4, 0xbe, 0x2a,
    0xeb, 0x00, 0x67, 0x7a, 0xd6, 0x46, 0x27, 0x78,
    0xa8, 0xf5, 0x22, 0x74, 0xb9, 0xd6, 0x05, 0xdf,
    0x25, 0x91, 0xb2, 0x30, 0x27, 0xa8, 0x7d, 0xff,
]);
const FUJI_X: Id = Id::new([
    0xab, 0x68, 0xeb, 0x1e, 0xe1, 0x42, 0xa0, 0x5c,
    0xfe, 0x76, 0x8c, 0x36, 0xe1, 0x1f, 0x0b, 0x59,
    0x6d, 0xb5, 0xa3, 0xc6, 0xc7, 0x7a, 0xab, 0xe6,
    0x65, 0xda, 0xd9, 0xe6, 0x38, 0xca, 0x94, 0xf7,
]);
const FUJI_C: Id = Id::new([
    0x7f, 0xc9, 0x3d, 0x85, 0xc6, 0xd6, 0x2c, 0x5b,
    0x2a, 0xc0, 0xb5, 0x19, 0xc8, 0x70, 0x10, 0xea,
    0x52, 0x94, 0x01, 0x2d, 0x1e, 0x40, 0x70, 0x30,
    0xd6, 0xac, 0xd0, 0x02, 0x1c, 0xac, 0x10, 0xd5,
]);
const FUJI_AVAX: Id = Id::new([
    0x3d, 0x9b, 0xda, 0xc0, 0xed, 0x1d, 0x76, 0x13,
    0x30, 0xcf, 0x68, 0x0e, 0xfd, 0xeb, 0x1a, 0x42,
    0x15, 0x9e, 0xb3, 0x87, 0xd6, 0xd2, 0x95, 0x0c,
    0x96, 0xf7, 0xd2, 0x8f, 0x61, 0xbb, 0xe2, 0xaa,
]);
const LOCAL_X: Id = Id::new([
    0xd8, 0x91, 0xad, 0x56, 0x05, 0x6d, 0x9c, 0x01,
    0xf1, 0x8f, 0x43, 0xf5, 0x8b, 0x5c, 0x78, 0x4a,
    0xd0, 0x7a, 0x4a, 0x49, 0xcf, 0x3d, 0x1f, 0x11,
    0x62, 0x38, 0x04, 0xb5, 0xcb, 0xa2, 0xc6, 0xbf,
]);
const LOCAL_C: Id = Id::new([
    0x9d, 0x07, 0x75, 0xf4, 0x50, 0x60, 0x4b, 0xd2,
    0xfb, 0xc4, 0x9c, 0xe0, 0xc5, 0xc1, 0xc6, 0xdf,
    0xeb, 0x2d, 0xc2, 0xac, 0xb8, 0xc9, 0x2c, 0x26,
    0xee, 0xae, 0x6e, 0x6d, 0xf4, 0x50, 0x2b, 0x19,
]);
const LOCAL_AVAX: Id = Id::new([
    0xdb, 0xcf, 0x89, 0x0f, 0x77, 0xf4, 0x9b, 0x96,
    0x85, 0x76, 0x48, 0xb7, 0x2b, 0x77, 0xf9, 0xf8,
    0x29, 0x37, 0xf2, 0x8a, 0x68, 0x70, 0x4a, 0xf0,
    0x5d, 0xa0, 0xdc, 0x12, 0xba, 0x53, 0xf2, 0xdb,
]);

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Everything the wallet needs to know about a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub network_id: u32,
    pub hrp: String,
    pub x_chain_id: Id,
    pub p_chain_id: Id,
    pub c_chain_id: Id,
    /// Asset paying fees and stake
    pub avax_asset_id: Id,
    pub tx_fee: u64,
    pub create_asset_fee: u64,
    /// Fee for transactions creating subnets or chains
    pub creation_tx_fee: u64,
    pub min_validator_stake: u64,
    pub min_delegation_stake: u64,
    pub goose_egg_cap: u64,
    pub discovery_chunk_size: u32,
    pub utxo_page_limit: u32,
}

impl NetworkConfig {
    pub fn mainnet() -> Self {
        Self {
            network_id: MAINNET_ID,
            hrp: "avax".to_string(),
            x_chain_id: MAINNET_X,
            p_chain_id: Id::ZERO,
            c_chain_id: MAINNET_C,
            avax_asset_id: MAINNET_AVAX,
            tx_fee: NANO_AVAX_PER_AVAX / 1_000,
            create_asset_fee: NANO_AVAX_PER_AVAX / 100,
            creation_tx_fee: NANO_AVAX_PER_AVAX,
            min_validator_stake: 2_000 * NANO_AVAX_PER_AVAX,
            min_delegation_stake: 25 * NANO_AVAX_PER_AVAX,
            goose_egg_cap: DEFAULT_GOOSE_EGG_CAP,
            discovery_chunk_size: DEFAULT_DISCOVERY_CHUNK,
            utxo_page_limit: DEFAULT_UTXO_PAGE_LIMIT,
        }
    }

    pub fn fuji() -> Self {
        Self {
            network_id: FUJI_ID,
            hrp: "fuji".to_string(),
            x_chain_id: FUJI_X,
            c_chain_id: FUJI_C,
            avax_asset_id: FUJI_AVAX,
            creation_tx_fee: NANO_AVAX_PER_AVAX / 10,
            min_validator_stake: NANO_AVAX_PER_AVAX,
            min_delegation_stake: NANO_AVAX_PER_AVAX,
            ..Self::mainnet()
        }
    }

    pub fn local() -> Self {
        Self {
            network_id: LOCAL_ID,
            hrp: "local".to_string(),
            x_chain_id: LOCAL_X,
            c_chain_id: LOCAL_C,
            avax_asset_id: LOCAL_AVAX,
            creation_tx_fee: NANO_AVAX_PER_AVAX / 10,
            ..Self::mainnet()
        }
    }

    /// Preset for a well-known network id
    pub fn for_network_id(network_id: u32) -> Option<Self> {
        match network_id {
            MAINNET_ID => Some(Self::mainnet()),
            FUJI_ID => Some(Self::fuji()),
            LOCAL_ID => Some(Self::local()),
            _ => None,
        }
    }

    pub fn blockchain_id(&self, chain: ChainKind) -> Id {
        match chain {
            ChainKind::Asset => self.x_chain_id,
            ChainKind::Platform => self.p_chain_id,
            ChainKind::Evm => self.c_chain_id,
        }
    }

    /// Chain kind whose blockchain id is `id` on this network
    pub fn chain_of(&self, id: &Id) -> Option<ChainKind> {
        ChainKind::ALL
            .into_iter()
            .find(|chain| &self.blockchain_id(*chain) == id)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if bech32::Hrp::parse(&self.hrp).is_err() {
            return Err(ConfigError::Invalid(format!("bad address prefix {:?}", self.hrp)));
        }
        if self.discovery_chunk_size == 0 {
            return Err(ConfigError::Invalid("discovery chunk size is zero".into()));
        }
        if self.utxo_page_limit == 0 {
            return Err(ConfigError::Invalid("UTXO page limit is zero".into()));
        }
        Ok(())
    }

    /// Load from a JSON file; missing fields take mainnet values
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_preset_ids() {
        let mainnet = NetworkConfig::mainnet();
        assert_eq!(
            mainnet.x_chain_id.to_string(),
            "2oYMBNV4eNHyqk2fjjV5nVQLDbtmNJzq5s3qs3Lo6ftnC6FByM"
        );
        assert_eq!(
            mainnet.c_chain_id.to_string(),
            "2q9e4r6Mu3U68nU1fYjgbR6JvwrRx36CohpAX5UQxse55x1Q5"
        );
        assert_eq!(
            mainnet.avax_asset_id.to_string(),
            "FvwEAhmxKfeiG8SnEvq42hc6whRyY3EFYAvebMqDNDGCgxN5Z"
        );
        assert_eq!(
            mainnet.p_chain_id.to_string(),
            "11111111111111111111111111111111LpoYY"
        );

        let fuji = NetworkConfig::fuji();
        assert_eq!(
            fuji.x_chain_id.to_string(),
            "2JVSBoinj9C2J33VntvzYtVJNZdN2NKiwwKjcumHUWEb5DbBrm"
        );
        assert_eq!(
            fuji.c_chain_id.to_string(),
            "yH8D7ThNJkxmtkuv2jgBa4P1Rn3Qpr4pPr7QYNfcdoS6k6HWp"
        );
        assert_eq!(
            fuji.avax_asset_id.to_string(),
            "U8iRqJoiJm8xZHAacmvYyZVwqQx6uDNtQeP3CQ6fcgQk3JqnK"
        );

        let local = NetworkConfig::local();
        assert_eq!(
            local.x_chain_id.to_string(),
            "2eNy1mUFdmaxXNj1eQHUe7Np4gju9sJsEtWQ4MX3ToiNKuADed"
        );
        assert_eq!(
            local.avax_asset_id.to_string(),
            "2fombhL7aGPwj3KH4bfrmJwW6PVnMobf9Y2fn9GwxiAAJyFDbe"
        );
    }

    #[test]
    fn test_presets_by_id() {
        for (id, hrp) in [(MAINNET_ID, "avax"), (FUJI_ID, "fuji"), (LOCAL_ID, "local")] {
            let config = NetworkConfig::for_network_id(id).unwrap();
            assert_eq!(config.hrp, hrp);
            assert_eq!(config.discovery_chunk_size, 20);
            assert_eq!(config.goose_egg_cap, DEFAULT_GOOSE_EGG_CAP);
            config.validate().unwrap();
        }
        assert!(NetworkConfig::for_network_id(7).is_none());
        assert_eq!(NetworkConfig::default(), NetworkConfig::mainnet());
    }

    #[test]
    fn test_chain_lookup() {
        let config = NetworkConfig::fuji();
        assert_eq!(config.chain_of(&config.c_chain_id), Some(ChainKind::Evm));
        assert_eq!(config.chain_of(&Id::ZERO), Some(ChainKind::Platform));
        assert_eq!(config.chain_of(&Id::new([9; 32])), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("network.json");

        let mut config = NetworkConfig::local();
        config.tx_fee = 42;
        config.save(&path).unwrap();
        assert_eq!(NetworkConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("network.json");
        fs::write(&path, r#"{"network_id": 5, "hrp": "fuji", "tx_fee": 7}"#).unwrap();

        let config = NetworkConfig::from_json_file(&path).unwrap();
        assert_eq!(config.network_id, 5);
        assert_eq!(config.tx_fee, 7);
        assert_eq!(config.x_chain_id, NetworkConfig::mainnet().x_chain_id);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("network.json");
        fs::write(&path, r#"{"discovery_chunk_size": 0}"#).unwrap();
        assert!(matches!(
            NetworkConfig::from_json_file(&path),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            NetworkConfig::from_json_file(&dir.path().join("missing.json")),
            Err(ConfigError::IoError(_))
        ));
    }
}
