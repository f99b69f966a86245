use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::codec::StoredRecord;
use crate::primitives::{PublicKey, Timestamp};

/// Host-ledger account embedded in every account-like record.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct BaseAccount {
    pub address: String,
    pub pub_key: Option<PublicKey>,
    pub account_number: u64,
    pub sequence: u64,
}

#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Pictures {
    pub profile: String,
    pub cover: String,
}

/// Account extended with public profile data.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Profile {
    pub account: BaseAccount,
    pub dtag: String,
    pub nickname: String,
    pub bio: String,
    pub pictures: Pictures,
    pub creation_time: Timestamp,
}

/// Anything stored under the account namespace.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AccountRecord {
    Base(BaseAccount),
    Profile(Profile),
}

impl AccountRecord {
    pub fn base_account(&self) -> &BaseAccount {
        match self {
            AccountRecord::Base(account) => account,
            AccountRecord::Profile(profile) => &profile.account,
        }
    }
}

impl StoredRecord for AccountRecord {
    const SCHEMA: &'static str = "account";
}
