//! Store key layouts.
//!
//! Keys are `prefix | 0x00 | field | 0x00 | field ...`. The separator keeps
//! namespaces such as `chain_links` and `chain_link_owner` apart and stops one
//! field from running into the next during prefix scans.

pub const CHAIN_LINKS_PREFIX: &[u8] = b"chain_links";
pub const CHAIN_LINK_OWNER_PREFIX: &[u8] = b"chain_link_owner";
pub const DEFAULT_EXTERNAL_ADDRESS_PREFIX: &[u8] = b"default_external_address";
pub const USER_APPLICATION_LINK_PREFIX: &[u8] = b"user_application_link";
pub const CLIENT_ID_PREFIX: &[u8] = b"client_id";
pub const DTAG_PREFIX: &[u8] = b"dtag";
pub const ACCOUNT_PREFIX: &[u8] = b"account";

/// Persisted schema version of the whole store.
pub const SCHEMA_VERSION_KEY: &[u8] = b"meta:schema_version";

const SEPARATOR: u8 = 0x00;

fn compose(prefix: &[u8], fields: &[&[u8]]) -> Vec<u8> {
    let len = prefix.len() + fields.iter().map(|f| f.len() + 1).sum::<usize>();
    let mut key = Vec::with_capacity(len);
    key.extend_from_slice(prefix);
    for field in fields {
        key.push(SEPARATOR);
        key.extend_from_slice(field);
    }
    key
}

/// Scan prefix covering every key of a namespace.
pub fn namespace(prefix: &[u8]) -> Vec<u8> {
    let mut key = prefix.to_vec();
    key.push(SEPARATOR);
    key
}

pub fn chain_link_key(owner: &str, chain_name: &str, address: &str) -> Vec<u8> {
    compose(
        CHAIN_LINKS_PREFIX,
        &[owner.as_bytes(), chain_name.as_bytes(), address.as_bytes()],
    )
}

/// Scan prefix for all links of an owner.
pub fn user_chain_links_prefix(owner: &str) -> Vec<u8> {
    let mut key = compose(CHAIN_LINKS_PREFIX, &[owner.as_bytes()]);
    key.push(SEPARATOR);
    key
}

/// Scan prefix for an owner's links on one chain.
pub fn user_chain_links_by_chain_prefix(owner: &str, chain_name: &str) -> Vec<u8> {
    let mut key = compose(CHAIN_LINKS_PREFIX, &[owner.as_bytes(), chain_name.as_bytes()]);
    key.push(SEPARATOR);
    key
}

pub fn chain_link_owner_key(chain_name: &str, address: &str, owner: &str) -> Vec<u8> {
    compose(
        CHAIN_LINK_OWNER_PREFIX,
        &[chain_name.as_bytes(), address.as_bytes(), owner.as_bytes()],
    )
}

/// Scan prefix for every owner of a foreign address. The owner is the key
/// suffix after this prefix.
pub fn chain_link_owner_prefix(chain_name: &str, address: &str) -> Vec<u8> {
    let mut key = compose(
        CHAIN_LINK_OWNER_PREFIX,
        &[chain_name.as_bytes(), address.as_bytes()],
    );
    key.push(SEPARATOR);
    key
}

pub fn default_external_address_key(owner: &str, chain_name: &str) -> Vec<u8> {
    compose(
        DEFAULT_EXTERNAL_ADDRESS_PREFIX,
        &[owner.as_bytes(), chain_name.as_bytes()],
    )
}

pub fn user_application_link_key(owner: &str, application: &str, username: &str) -> Vec<u8> {
    compose(
        USER_APPLICATION_LINK_PREFIX,
        &[
            owner.as_bytes(),
            application.to_lowercase().as_bytes(),
            username.to_lowercase().as_bytes(),
        ],
    )
}

pub fn client_id_key(client_id: &str) -> Vec<u8> {
    compose(CLIENT_ID_PREFIX, &[client_id.as_bytes()])
}

pub fn dtag_key(dtag: &str) -> Vec<u8> {
    compose(DTAG_PREFIX, &[dtag.to_lowercase().as_bytes()])
}

pub fn account_key(address: &str) -> Vec<u8> {
    compose(ACCOUNT_PREFIX, &[address.as_bytes()])
}

/// Printable form of a key for logs and error messages. Separators render as
/// `/`, other non-printable bytes are escaped.
pub fn display_key(key: &[u8]) -> String {
    let mut out = String::with_capacity(key.len());
    for &byte in key {
        if byte == SEPARATOR {
            out.push('/');
        } else {
            out.extend(std::ascii::escape_default(byte).map(char::from));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_link_key_layout() {
        let key = chain_link_key("desmos1a", "cosmos", "cosmos1b");
        assert_eq!(key, b"chain_links\0desmos1a\0cosmos\0cosmos1b".to_vec());
        assert!(key.starts_with(&namespace(CHAIN_LINKS_PREFIX)));
        assert!(key.starts_with(&user_chain_links_prefix("desmos1a")));
        assert!(key.starts_with(&user_chain_links_by_chain_prefix("desmos1a", "cosmos")));
    }

    #[test]
    fn test_namespaces_do_not_overlap() {
        let owner_key = chain_link_owner_key("cosmos", "cosmos1b", "desmos1a");
        assert!(!owner_key.starts_with(&namespace(CHAIN_LINKS_PREFIX)));
        assert!(owner_key.starts_with(&namespace(CHAIN_LINK_OWNER_PREFIX)));
    }

    #[test]
    fn test_owner_prefix_is_exact_per_address() {
        let prefix = chain_link_owner_prefix("cosmos", "abc");
        let other = chain_link_owner_key("cosmos", "abcd", "desmos1a");
        assert!(!other.starts_with(&prefix));
        let own = chain_link_owner_key("cosmos", "abc", "desmos1a");
        assert_eq!(&own[prefix.len()..], b"desmos1a");
    }

    #[test]
    fn test_lowercased_fields() {
        assert_eq!(dtag_key("Alice"), dtag_key("alice"));
        assert_eq!(
            user_application_link_key("desmos1a", "Twitter", "Bob"),
            user_application_link_key("desmos1a", "twitter", "bob")
        );
    }

    #[test]
    fn test_display_key() {
        assert_eq!(
            display_key(&chain_link_key("desmos1a", "cosmos", "cosmos1b")),
            "chain_links/desmos1a/cosmos/cosmos1b"
        );
        assert_eq!(display_key(&[0x13, b'a']), "\\x13a");
    }
}
