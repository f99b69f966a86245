//! The concrete schema migrations, oldest first.

use xlink_proof::{classify_value_type, retag_proof, ProofVerifier, SignDocCodecs};
use xlink_types::account::{AccountRecord, Pictures, Profile};
use xlink_types::app_link::ApplicationLink;
use xlink_types::codec::StoredRecord;
use xlink_types::error::LinkError;
use xlink_types::keys::{
    chain_link_key, chain_link_owner_key, client_id_key, display_key, dtag_key, namespace,
    user_application_link_key, ACCOUNT_PREFIX, CHAIN_LINKS_PREFIX,
};
use xlink_types::legacy::{
    AccountRecordV1, ChainLinkV1, LEGACY_APP_LINK_PREFIX, LEGACY_CHAIN_LINK_PREFIX,
    LEGACY_CLIENT_ID_PREFIX, LEGACY_DTAG_PREFIX,
};
use xlink_types::link::{ChainLink, Proof};
use xlink_types::signature::SignatureEnvelope;

use crate::error::MigrationError;
use crate::pipeline::{IndexEntry, MigrationStep, Outcome, RecordTransform};

/// Schema version produced by the last step.
pub const LATEST_SCHEMA_VERSION: u32 = 6;

/// Every known step, in order.
pub fn standard_steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep::new("account-shape-upgrade", 1, 2).with_pass(AccountShapeUpgrade),
        MigrationStep::new("re-key-indexes", 2, 3)
            .with_pass(DtagRekey)
            .with_pass(AppLinkRekey)
            .with_pass(LegacyClientIdCleanup)
            .with_pass(ChainLinkRekey),
        MigrationStep::new("envelope-upgrade", 3, 4).with_pass(EnvelopeUpgrade::standard()),
        MigrationStep::new("drop-invalid-chain-links", 4, 5)
            .with_pass(DropInvalidChainLinks::standard()),
        MigrationStep::new("re-tag-signatures", 5, 6).with_pass(RetagSignatures::standard()),
    ]
}

fn record_error(key: &[u8], source: LinkError) -> MigrationError {
    MigrationError::Link {
        key: display_key(key),
        source,
    }
}

fn decode<T: StoredRecord>(key: &[u8], value: &[u8]) -> Result<T, MigrationError> {
    T::decode(value).map_err(|e| record_error(key, e))
}

fn encode<T: StoredRecord>(key: &[u8], record: &T) -> Result<Vec<u8>, MigrationError> {
    record.encode().map_err(|e| record_error(key, e))
}

fn key_suffix<'k>(key: &'k [u8], prefix: &[u8]) -> Result<&'k str, MigrationError> {
    std::str::from_utf8(&key[prefix.len()..])
        .map_err(|e| record_error(key, LinkError::decode(format!("key is not utf-8: {}", e))))
}

// ─── 1 → 2 ──────────────────────────────────────────────────────────────────

/// Re-wraps v1 accounts so profile pictures live in their own struct.
pub struct AccountShapeUpgrade;

impl RecordTransform for AccountShapeUpgrade {
    fn name(&self) -> &'static str {
        "accounts"
    }

    fn namespace(&self) -> Vec<u8> {
        namespace(ACCOUNT_PREFIX)
    }

    fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError> {
        let upgraded = match decode::<AccountRecordV1>(key, value)? {
            AccountRecordV1::Base(account) => AccountRecord::Base(account),
            AccountRecordV1::Profile(old) => AccountRecord::Profile(Profile {
                account: old.account,
                dtag: old.dtag,
                nickname: old.nickname,
                bio: old.bio,
                pictures: Pictures {
                    profile: old.profile_picture,
                    cover: old.cover_picture,
                },
                creation_time: old.creation_time,
            }),
        };
        Ok(Outcome::keep(key.to_vec(), encode(key, &upgraded)?))
    }
}

// ─── 2 → 3 ──────────────────────────────────────────────────────────────────

/// `0x10 | dtag` → `dtag | lowercase(dtag)`. The owner address value is kept.
pub struct DtagRekey;

impl RecordTransform for DtagRekey {
    fn name(&self) -> &'static str {
        "dtags"
    }

    fn namespace(&self) -> Vec<u8> {
        LEGACY_DTAG_PREFIX.to_vec()
    }

    fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError> {
        let dtag = key_suffix(key, LEGACY_DTAG_PREFIX)?;
        Ok(Outcome::keep(dtag_key(dtag), value.to_vec()))
    }
}

/// Moves application links under their owner and rebuilds the client-id index.
pub struct AppLinkRekey;

impl RecordTransform for AppLinkRekey {
    fn name(&self) -> &'static str {
        "application-links"
    }

    fn namespace(&self) -> Vec<u8> {
        LEGACY_APP_LINK_PREFIX.to_vec()
    }

    fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError> {
        let link: ApplicationLink = decode(key, value)?;
        let new_key = user_application_link_key(&link.owner, &link.application, &link.username);
        Ok(Outcome::Keep {
            index: vec![IndexEntry::pointer(
                client_id_key(&link.client_id),
                new_key.clone(),
            )],
            key: new_key,
            value: value.to_vec(),
        })
    }
}

/// Old client-id entries are discarded; [`AppLinkRekey`] writes fresh ones.
pub struct LegacyClientIdCleanup;

impl RecordTransform for LegacyClientIdCleanup {
    fn name(&self) -> &'static str {
        "legacy-client-ids"
    }

    fn namespace(&self) -> Vec<u8> {
        LEGACY_CLIENT_ID_PREFIX.to_vec()
    }

    fn transform(&self, _key: &[u8], _value: &[u8]) -> Result<Outcome, MigrationError> {
        Ok(Outcome::drop("client-id index is rebuilt from application links"))
    }
}

/// `0x13 | owner chain address` → `chain_links | owner | chain | address`.
pub struct ChainLinkRekey;

impl RecordTransform for ChainLinkRekey {
    fn name(&self) -> &'static str {
        "chain-links"
    }

    fn namespace(&self) -> Vec<u8> {
        LEGACY_CHAIN_LINK_PREFIX.to_vec()
    }

    fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError> {
        let link: ChainLinkV1 = decode(key, value)?;
        Ok(Outcome::keep(
            chain_link_key(&link.owner, &link.chain_config.name, link.address.value()),
            value.to_vec(),
        ))
    }
}

// ─── 3 → 4 ──────────────────────────────────────────────────────────────────

/// Wraps each bare signature in a single-signature envelope tagged with the
/// classified value type.
pub struct EnvelopeUpgrade {
    codecs: SignDocCodecs<'static>,
}

impl EnvelopeUpgrade {
    pub fn new(codecs: SignDocCodecs<'static>) -> Self {
        Self { codecs }
    }

    pub fn standard() -> Self {
        Self::new(SignDocCodecs::standard())
    }
}

impl RecordTransform for EnvelopeUpgrade {
    fn name(&self) -> &'static str {
        "chain-link-envelopes"
    }

    fn namespace(&self) -> Vec<u8> {
        namespace(CHAIN_LINKS_PREFIX)
    }

    fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError> {
        let old: ChainLinkV1 = decode(key, value)?;
        let plaintext = hex::decode(&old.proof.plaintext_hex).map_err(|e| {
            record_error(key, LinkError::decode(format!("invalid plaintext hex: {}", e)))
        })?;
        let value_type = classify_value_type(&plaintext, &self.codecs);
        let upgraded = ChainLink {
            owner: old.owner,
            address: old.address,
            proof: Proof {
                public_key: old.proof.public_key,
                signature: SignatureEnvelope::single(value_type, old.proof.signature),
                plaintext_hex: old.proof.plaintext_hex,
            },
            chain_config: old.chain_config,
            creation_time: old.creation_time,
        };
        Ok(Outcome::keep(key.to_vec(), encode(key, &upgraded)?))
    }
}

// ─── 4 → 5 ──────────────────────────────────────────────────────────────────

/// Deletes chain links whose proof does not verify and indexes the rest by
/// owner.
pub struct DropInvalidChainLinks {
    verifier: ProofVerifier<'static>,
}

impl DropInvalidChainLinks {
    pub fn new(verifier: ProofVerifier<'static>) -> Self {
        Self { verifier }
    }

    pub fn standard() -> Self {
        Self::new(ProofVerifier::standard())
    }
}

impl RecordTransform for DropInvalidChainLinks {
    fn name(&self) -> &'static str {
        "chain-link-verification"
    }

    fn namespace(&self) -> Vec<u8> {
        namespace(CHAIN_LINKS_PREFIX)
    }

    fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError> {
        let link: ChainLink = decode(key, value)?;
        match self.verifier.verify_link(&link) {
            Ok(()) => Ok(Outcome::Keep {
                key: key.to_vec(),
                value: value.to_vec(),
                index: vec![IndexEntry::sentinel(chain_link_owner_key(
                    &link.chain_config.name,
                    link.address.value(),
                    &link.owner,
                ))],
            }),
            Err(e) if e.is_fatal() => Err(record_error(key, e)),
            Err(e) => Ok(Outcome::drop(e.to_string())),
        }
    }
}

// ─── 5 → 6 ──────────────────────────────────────────────────────────────────

/// Re-classifies every proof plaintext and rewrites the envelope tags.
pub struct RetagSignatures {
    codecs: SignDocCodecs<'static>,
}

impl RetagSignatures {
    pub fn new(codecs: SignDocCodecs<'static>) -> Self {
        Self { codecs }
    }

    pub fn standard() -> Self {
        Self::new(SignDocCodecs::standard())
    }
}

impl RecordTransform for RetagSignatures {
    fn name(&self) -> &'static str {
        "chain-link-tags"
    }

    fn namespace(&self) -> Vec<u8> {
        namespace(CHAIN_LINKS_PREFIX)
    }

    fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError> {
        let mut link: ChainLink = decode(key, value)?;
        link.proof = retag_proof(&link.proof, &self.codecs).map_err(|e| record_error(key, e))?;
        Ok(Outcome::keep(key.to_vec(), encode(key, &link)?))
    }
}
