//! Unsigned transaction annotated with its signers

use std::collections::HashMap;

use crate::core::Signatory;
use crate::crypto::DerivationPath;

use super::credential::CredentialKind;
use super::unsigned::UnsignedTx;

/// The signers of one credential slot, in address-index order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSigners {
    pub kind: CredentialKind,
    pub signatories: Vec<Signatory>,
}

/// An unsigned transaction ready to be handed to a signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedTx {
    pub tx: UnsignedTx,
    pub signers: Vec<CredentialSigners>,
    pub paths: HashMap<Signatory, DerivationPath>,
}

impl ExtendedTx {
    pub fn new(
        tx: UnsignedTx,
        signers: Vec<CredentialSigners>,
        paths: HashMap<Signatory, DerivationPath>,
    ) -> Self {
        Self { tx, signers, paths }
    }

    /// Every signatory once, in first-use order
    pub fn signatories(&self) -> Vec<&Signatory> {
        let mut seen = Vec::new();
        for signatory in self.signers.iter().flat_map(|slot| slot.signatories.iter()) {
            if !seen.contains(&signatory) {
                seen.push(signatory);
            }
        }
        seen
    }

    /// Signatories that have no derivation path
    pub fn missing_paths(&self) -> Vec<&Signatory> {
        self.signatories()
            .into_iter()
            .filter(|signatory| !self.paths.contains_key(*signatory))
            .collect()
    }
}
