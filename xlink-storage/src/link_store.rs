use xlink_proof::{validate_chain_link, validate_signed_value, ProofVerifier};
use xlink_types::codec::StoredRecord;
use xlink_types::error::LinkError;
use xlink_types::keys::{
    chain_link_key, chain_link_owner_key, chain_link_owner_prefix, default_external_address_key,
    display_key, user_chain_links_by_chain_prefix, user_chain_links_prefix,
};
use xlink_types::link::ChainLink;
use xlink_types::primitives::SENTINEL;

use crate::error::StorageError;
use crate::traits::{BatchOp, BatchWriter};

/// Storage layer for chain links, their owner index and each owner's default
/// external address per chain.
pub struct ChainLinkStore<S: BatchWriter> {
    store: S,
    verifier: ProofVerifier<'static>,
}

impl<S: BatchWriter> ChainLinkStore<S> {
    /// Create a new ChainLinkStore wrapping the given store, verifying proofs
    /// with the standard sign-document codecs.
    pub fn new(store: S) -> Self {
        Self::with_verifier(store, ProofVerifier::standard())
    }

    pub fn with_verifier(store: S, verifier: ProofVerifier<'static>) -> Self {
        Self { store, verifier }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    fn decode_link(bytes: &[u8]) -> Result<ChainLink, StorageError> {
        ChainLink::decode(bytes).map_err(|e| StorageError::DeserializationError {
            reason: e.to_string(),
        })
    }

    /// Validate, verify and store a new link.
    ///
    /// The first link an owner creates on a chain becomes that chain's
    /// default external address.
    pub fn save_chain_link(&self, link: &ChainLink) -> Result<(), StorageError> {
        validate_chain_link(link)?;
        self.verifier
            .verify(&link.proof, &link.address, &link.proof.public_key)?;
        let plaintext = hex::decode(&link.proof.plaintext_hex)
            .map_err(|e| LinkError::decode(format!("invalid plaintext hex: {}", e)))?;
        validate_signed_value(
            &link.proof.signature,
            &plaintext,
            &link.owner,
            self.verifier.codecs(),
        )?;

        let chain = link.chain_config.name.as_str();
        let address = link.address.value();
        let key = chain_link_key(&link.owner, chain, address);
        if self.store.exists(&key)? {
            return Err(StorageError::DuplicatedChainLink {
                key: display_key(&key),
            });
        }

        let value = link
            .encode()
            .map_err(|e| StorageError::SerializationError {
                reason: e.to_string(),
            })?;
        let mut ops = vec![
            BatchOp::Put { key, value },
            BatchOp::Put {
                key: chain_link_owner_key(chain, address, &link.owner),
                value: SENTINEL.to_vec(),
            },
        ];
        let default_key = default_external_address_key(&link.owner, chain);
        if !self.store.exists(&default_key)? {
            ops.push(BatchOp::Put {
                key: default_key,
                value: address.as_bytes().to_vec(),
            });
        }
        self.store.write_batch(ops)?;
        tracing::debug!(owner = %link.owner, chain, address, "saved chain link");
        Ok(())
    }

    pub fn get_chain_link(
        &self,
        owner: &str,
        chain_name: &str,
        address: &str,
    ) -> Result<Option<ChainLink>, StorageError> {
        match self.store.get(&chain_link_key(owner, chain_name, address))? {
            Some(bytes) => Ok(Some(Self::decode_link(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn has_chain_link(
        &self,
        owner: &str,
        chain_name: &str,
        address: &str,
    ) -> Result<bool, StorageError> {
        self.store
            .exists(&chain_link_key(owner, chain_name, address))
    }

    /// All links of `owner`, ordered by chain name then address.
    pub fn user_chain_links(&self, owner: &str) -> Result<Vec<ChainLink>, StorageError> {
        self.store
            .prefix_scan(&user_chain_links_prefix(owner))?
            .iter()
            .map(|(_, bytes)| Self::decode_link(bytes))
            .collect()
    }

    /// Owners that linked `address` on `chain_name`, found through the owner index.
    pub fn chain_link_owners(
        &self,
        chain_name: &str,
        address: &str,
    ) -> Result<Vec<String>, StorageError> {
        let prefix = chain_link_owner_prefix(chain_name, address);
        self.store
            .prefix_scan(&prefix)?
            .into_iter()
            .map(|(key, _)| {
                String::from_utf8(key[prefix.len()..].to_vec()).map_err(|e| {
                    StorageError::DeserializationError {
                        reason: e.to_string(),
                    }
                })
            })
            .collect()
    }

    pub fn default_external_address(
        &self,
        owner: &str,
        chain_name: &str,
    ) -> Result<Option<String>, StorageError> {
        match self
            .store
            .get(&default_external_address_key(owner, chain_name))?
        {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StorageError::DeserializationError {
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Remove a link and its owner index entry. If it was the default
    /// external address, the oldest remaining link on that chain takes over.
    pub fn delete_chain_link(&self, link: &ChainLink) -> Result<(), StorageError> {
        let chain = link.chain_config.name.as_str();
        let address = link.address.value();
        let key = chain_link_key(&link.owner, chain, address);
        if !self.store.exists(&key)? {
            return Err(StorageError::ChainLinkNotFound {
                key: display_key(&key),
            });
        }

        let mut ops = vec![
            BatchOp::Delete { key: key.clone() },
            BatchOp::Delete {
                key: chain_link_owner_key(chain, address, &link.owner),
            },
        ];

        let default_key = default_external_address_key(&link.owner, chain);
        if self.default_external_address(&link.owner, chain)?.as_deref() == Some(address) {
            let mut oldest: Option<ChainLink> = None;
            for (other_key, bytes) in self
                .store
                .prefix_scan(&user_chain_links_by_chain_prefix(&link.owner, chain))?
            {
                if other_key == key {
                    continue;
                }
                let other = Self::decode_link(&bytes)?;
                if oldest
                    .as_ref()
                    .map_or(true, |o| other.creation_time < o.creation_time)
                {
                    oldest = Some(other);
                }
            }
            match oldest {
                Some(next) => {
                    tracing::debug!(
                        owner = %link.owner,
                        chain,
                        address = next.address.value(),
                        "promoted default external address"
                    );
                    ops.push(BatchOp::Put {
                        key: default_key,
                        value: next.address.value().as_bytes().to_vec(),
                    });
                }
                None => ops.push(BatchOp::Delete { key: default_key }),
            }
        }

        self.store.write_batch(ops)
    }

    /// Delete every link of `owner`. Returns how many were removed.
    pub fn delete_all_user_chain_links(&self, owner: &str) -> Result<usize, StorageError> {
        let links = self.user_chain_links(owner)?;
        for link in &links {
            self.delete_chain_link(link)?;
        }
        Ok(links.len())
    }
}
