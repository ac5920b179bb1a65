/// Accounts & Addresses
///
/// Every actor (users, signers, the market engine escrow, the resolution
/// bridge, the quorum wallet, the oracle) is identified by an `Address`.
/// User addresses derive from an Ed25519 verifying key, component addresses
/// derive from a fixed label.
///
/// `DevAccounts` provides deterministic keypairs derived from a master seed,
/// so signer sets and test actors are stable across restarts.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Master seed for deterministic dev keys (NEVER use in production!)
pub const DEV_SEED: &[u8; 32] = b"QUORUM_MARKET_DEV_MASTER_SEED_01";

/// Deterministic dev account names. SIGNER1..SIGNER5 form the default
/// quorum; OWNER deploys the market engine.
pub const DEV_ACCOUNT_NAMES: [&str; 11] = [
    "OWNER", "SIGNER1", "SIGNER2", "SIGNER3", "SIGNER4", "SIGNER5",
    "ALICE", "BOB", "CAROL", "DAVE", "ERIN",
];

/// Names of the default quorum signers
pub const DEFAULT_SIGNER_NAMES: [&str; 5] = ["SIGNER1", "SIGNER2", "SIGNER3", "SIGNER4", "SIGNER5"];

// ============================================================================
// ADDRESS
// ============================================================================

/// 20-byte account identifier rendered as `0x` + 40 lowercase hex chars
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct AddressParseError(pub String);

impl Address {
    fn from_digest(digest: &[u8]) -> Self {
        Address(format!("0x{}", hex::encode(&digest[12..32])))
    }

    /// Address owned by an Ed25519 key: last 20 bytes of SHA256(pubkey)
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        Self::from_digest(&digest)
    }

    /// Address of a protocol component (escrow, wallet, bridge, oracle)
    pub fn contract(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"contract:");
        hasher.update(label.as_bytes());
        Self::from_digest(&hasher.finalize())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for log lines
    pub fn short(&self) -> &str {
        &self.0[..10]
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| AddressParseError(s.to_string()))?;
        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError(s.to_string()));
        }
        Ok(Address(format!("0x{}", hex_part.to_lowercase())))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ACCOUNT
// ============================================================================

/// A keypair with its derived address
#[derive(Clone)]
pub struct Account {
    pub name: String,
    pub signing_key: SigningKey,
    pub verifying_key: VerifyingKey,
    pub address: Address,
}

impl Account {
    /// Derive an account from a seed and name: key = SHA256(seed || name)
    pub fn from_seed(seed: &[u8; 32], name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(name.as_bytes());
        let derived_key: [u8; 32] = hasher.finalize().into();
        Self::from_signing_key(name, SigningKey::from_bytes(&derived_key))
    }

    /// Fresh random account
    pub fn generate(name: &str) -> Self {
        Self::from_signing_key(name, SigningKey::generate(&mut OsRng))
    }

    fn from_signing_key(name: &str, signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let address = Address::from_verifying_key(&verifying_key);
        Account {
            name: name.to_string(),
            signing_key,
            verifying_key,
            address,
        }
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.sign(message).to_bytes())
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.verifying_key.verify(message, signature).is_ok()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.as_bytes())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish()
    }
}

/// Public view of an account (for API responses)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub name: String,
    pub address: Address,
    pub public_key_hex: String,
}

impl From<&Account> for AccountInfo {
    fn from(account: &Account) -> Self {
        AccountInfo {
            name: account.name.clone(),
            address: account.address.clone(),
            public_key_hex: account.public_key_hex(),
        }
    }
}

// ============================================================================
// DEV ACCOUNTS
// ============================================================================

/// Deterministic accounts for development and tests
#[derive(Debug, Clone)]
pub struct DevAccounts {
    accounts: HashMap<String, Account>,
    by_address: HashMap<Address, String>,
}

impl DevAccounts {
    pub fn new() -> Self {
        let mut accounts = HashMap::new();
        let mut by_address = HashMap::new();
        for name in DEV_ACCOUNT_NAMES.iter() {
            let account = Account::from_seed(DEV_SEED, name);
            by_address.insert(account.address.clone(), name.to_string());
            accounts.insert(name.to_string(), account);
        }
        DevAccounts { accounts, by_address }
    }

    /// Look up by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&Account> {
        self.accounts.get(&name.to_uppercase())
    }

    pub fn get_by_address(&self, address: &Address) -> Option<&Account> {
        self.by_address
            .get(address)
            .and_then(|name| self.accounts.get(name))
    }

    /// Resolve a dev account name or a literal address
    pub fn resolve(&self, identifier: &str) -> Option<Address> {
        if let Some(account) = self.get(identifier) {
            return Some(account.address.clone());
        }
        identifier.parse().ok()
    }

    pub fn list(&self) -> Vec<AccountInfo> {
        DEV_ACCOUNT_NAMES
            .iter()
            .filter_map(|name| self.accounts.get(*name))
            .map(AccountInfo::from)
            .collect()
    }
}

impl Default for DevAccounts {
    fn default() -> Self {
        Self::new()
    }
}
