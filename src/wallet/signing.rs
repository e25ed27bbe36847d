//! Attach signer paths to a transaction and collect its credentials

use std::collections::HashMap;

use crate::core::{Address, Signatory, Utxo, UtxoId};
use crate::tx::{Credential, CredentialSigners, ExtendedTx, SignedTx, SpendSource, UnsignedTx};

use super::account::AVAX_COIN_TYPE;
use super::address_manager::AddressManager;
use super::signer::{Signer, SignerError};
use super::WalletError;

/// Resolve who must sign each credential slot of `tx`.
///
/// UTXO slots are resolved through the owners of the spent UTXO, which must be
/// in `utxos`; account slots through the manager's EVM accounts.
pub async fn extend_transaction(
    tx: UnsignedTx,
    utxos: &[Utxo],
    manager: &AddressManager,
) -> Result<ExtendedTx, WalletError> {
    let by_id: HashMap<UtxoId, &Utxo> = utxos.iter().map(|utxo| (utxo.utxo_id, utxo)).collect();
    let alias = tx.chain().alias();

    let mut signers = Vec::new();
    let mut paths = HashMap::new();
    for requirement in tx.signature_requirements()? {
        let signatories = match requirement.source {
            SpendSource::Utxo(utxo_id) => {
                let utxo = by_id
                    .get(&utxo_id)
                    .ok_or(WalletError::UnresolvedUtxo(utxo_id))?;
                let owners = &utxo.output.owners().addresses;
                let mut addresses = Vec::with_capacity(requirement.address_indices.len());
                for index in &requirement.address_indices {
                    let owner = owners
                        .get(*index as usize)
                        .ok_or(WalletError::OwnerIndexOutOfRange {
                            utxo_id,
                            index: *index,
                        })?;
                    addresses.push(Address::new(alias, manager.hrp(), *owner)?);
                }
                for extended in manager.extended(&addresses).await? {
                    paths.insert(
                        Signatory::Address(extended.address),
                        extended.path.derivation_path(AVAX_COIN_TYPE)?,
                    );
                }
                addresses.into_iter().map(Signatory::Address).collect()
            }
            SpendSource::Account(address) => {
                let account = manager
                    .eth_account(&address)
                    .await
                    .ok_or(WalletError::UnknownEthAccount(address))?;
                paths.insert(Signatory::Eth(address), account.path()?);
                vec![Signatory::Eth(address)]
            }
        };
        signers.push(CredentialSigners {
            kind: requirement.kind,
            signatories,
        });
    }

    log::debug!(
        "Transaction needs {} credentials from {} keys",
        signers.len(),
        paths.len()
    );
    Ok(ExtendedTx::new(tx, signers, paths))
}

/// Have `signer` sign `extended` and assemble credentials in slot order
pub async fn sign_transaction(
    extended: &ExtendedTx,
    signer: &dyn Signer,
) -> Result<SignedTx, WalletError> {
    if let Some(missing) = extended.missing_paths().first() {
        return Err(WalletError::MissingPath(missing.to_string()));
    }
    let unsigned = extended.tx.serialize()?;
    let signatures = signer.sign_transaction(&unsigned, &extended.paths).await?;

    let mut credentials = Vec::with_capacity(extended.signers.len());
    for slot in &extended.signers {
        let mut slot_signatures = Vec::with_capacity(slot.signatories.len());
        for signatory in &slot.signatories {
            let signature = signatures
                .get(signatory)
                .copied()
                .ok_or_else(|| SignerError::MissingSignature(signatory.clone()))?;
            slot_signatures.push(signature);
        }
        credentials.push(Credential::new(slot.kind, slot_signatures));
    }

    let signed = SignedTx::new(extended.tx.clone(), credentials)?;
    log::info!("Signed {} transaction {}", signed.tx.chain(), signed.id()?);
    Ok(signed)
}
