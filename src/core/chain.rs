//! Chain kinds of the ledger

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three chain types of the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainKind {
    /// Asset-transfer chain (`X`)
    Asset,
    /// Staking chain (`P`)
    Platform,
    /// Account-based chain bridged through atomic UTXOs (`C`)
    Evm,
}

impl ChainKind {
    pub const ALL: [ChainKind; 3] = [ChainKind::Asset, ChainKind::Platform, ChainKind::Evm];

    /// Short alias used as the address prefix
    pub fn alias(&self) -> &'static str {
        match self {
            ChainKind::Asset => "X",
            ChainKind::Platform => "P",
            ChainKind::Evm => "C",
        }
    }

    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "X" => Some(ChainKind::Asset),
            "P" => Some(ChainKind::Platform),
            "C" => Some(ChainKind::Evm),
            _ => None,
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

impl FromStr for ChainKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| format!("unknown chain alias: {}", s))
    }
}
