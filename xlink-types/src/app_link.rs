use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::codec::StoredRecord;
use crate::primitives::{Owner, Timestamp};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AppLinkState {
    Initialized,
    VerificationStarted,
    VerificationError,
    VerificationSuccess,
    TimedOut,
}

/// Link between a local account and a username on an external application,
/// verified by an oracle request identified by `client_id`.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ApplicationLink {
    pub owner: Owner,
    pub application: String,
    pub username: String,
    pub client_id: String,
    pub state: AppLinkState,
    pub creation_time: Timestamp,
}

impl StoredRecord for ApplicationLink {
    const SCHEMA: &'static str = "application_link";
}
