//! Signed Call Envelopes
//!
//! Every state-changing API call arrives as an Ed25519 signed envelope. The
//! sender address is derived from the public key, so a verified envelope is
//! the authenticated caller every core operation takes.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::accounts::{Account, Address};
use crate::clock::Timestamp;
use crate::ledger::Amount;
use crate::market_resolve::{MarketId, Side};
use crate::quorum::{CallPayload, TxId};

/// Default envelope expiry window (5 minutes)
pub const TX_EXPIRY_SECS: u64 = 300;

/// Tolerated clock skew for envelopes stamped in the future
pub const CLOCK_SKEW_SECS: u64 = 60;

/// Call type identifiers, bound into the signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CallType {
    CreateMarket = 1,
    AddLiquidity = 2,
    BuyShares = 3,
    AssertQuestion = 4,
    ResolveMarket = 5,
    ClaimPayout = 6,
    WithdrawLiquidity = 7,
    BurnShares = 8,
    ProposeTransaction = 9,
    SignTransaction = 10,
    ExecuteTransaction = 11,
}

impl CallType {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(CallType::CreateMarket),
            2 => Some(CallType::AddLiquidity),
            3 => Some(CallType::BuyShares),
            4 => Some(CallType::AssertQuestion),
            5 => Some(CallType::ResolveMarket),
            6 => Some(CallType::ClaimPayout),
            7 => Some(CallType::WithdrawLiquidity),
            8 => Some(CallType::BurnShares),
            9 => Some(CallType::ProposeTransaction),
            10 => Some(CallType::SignTransaction),
            11 => Some(CallType::ExecuteTransaction),
            _ => None,
        }
    }
}

/// Operation requested by a signed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallRequest {
    CreateMarket { question: String, duration_secs: u64 },
    AddLiquidity { market_id: MarketId, amount: Amount },
    BuyShares { market_id: MarketId, side: Side, amount: Amount },
    AssertQuestion { market_id: MarketId },
    ResolveMarket { market_id: MarketId },
    ClaimPayout { market_id: MarketId },
    WithdrawLiquidity { market_id: MarketId },
    BurnShares { market_id: MarketId },
    ProposeTransaction { target: Address, payload: CallPayload, value: Amount },
    SignTransaction { tx_id: TxId },
    ExecuteTransaction { tx_id: TxId },
}

impl CallRequest {
    pub fn call_type(&self) -> CallType {
        match self {
            CallRequest::CreateMarket { .. } => CallType::CreateMarket,
            CallRequest::AddLiquidity { .. } => CallType::AddLiquidity,
            CallRequest::BuyShares { .. } => CallType::BuyShares,
            CallRequest::AssertQuestion { .. } => CallType::AssertQuestion,
            CallRequest::ResolveMarket { .. } => CallType::ResolveMarket,
            CallRequest::ClaimPayout { .. } => CallType::ClaimPayout,
            CallRequest::WithdrawLiquidity { .. } => CallType::WithdrawLiquidity,
            CallRequest::BurnShares { .. } => CallType::BurnShares,
            CallRequest::ProposeTransaction { .. } => CallType::ProposeTransaction,
            CallRequest::SignTransaction { .. } => CallType::SignTransaction,
            CallRequest::ExecuteTransaction { .. } => CallType::ExecuteTransaction,
        }
    }

    /// Canonical JSON bytes bound into the signature
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignedCallError {
    #[error("invalid pubkey: {0}")]
    InvalidPubkey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signature does not match")]
    SignatureMismatch,

    #[error("call stamped {timestamp} is outside the validity window at {now}")]
    Expired { timestamp: Timestamp, now: Timestamp },

    #[error("call_type does not match the call")]
    TypeMismatch,

    #[error("nonce {got} must be greater than {last}")]
    StaleNonce { last: u64, got: u64 },
}

impl SignedCallError {
    pub fn code(&self) -> &'static str {
        match self {
            SignedCallError::InvalidPubkey(_) => "InvalidPubkey",
            SignedCallError::InvalidSignature(_) => "InvalidSignature",
            SignedCallError::SignatureMismatch => "SignatureMismatch",
            SignedCallError::Expired { .. } => "Expired",
            SignedCallError::TypeMismatch => "TypeMismatch",
            SignedCallError::StaleNonce { .. } => "StaleNonce",
        }
    }
}

/// A signed call envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedCall {
    /// Sender's Ed25519 public key (64 hex chars)
    pub sender_pubkey: String,
    /// Must be greater than the sender's last accepted nonce
    pub nonce: u64,
    /// Unix timestamp when the call was signed
    pub timestamp: Timestamp,
    pub call_type: CallType,
    pub call: CallRequest,
    /// Ed25519 signature (128 hex chars)
    pub signature: String,
}

impl SignedCall {
    /// Build and sign a call with `account`
    pub fn sign(account: &Account, nonce: u64, timestamp: Timestamp, call: CallRequest) -> Self {
        let mut signed = SignedCall {
            sender_pubkey: account.public_key_hex(),
            nonce,
            timestamp,
            call_type: call.call_type(),
            call,
            signature: String::new(),
        };
        signed.signature = account.sign_hex(&signed.signing_bytes());
        signed
    }

    /// SHA256(call_type || nonce || timestamp || sender_pubkey || call_json)
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update([self.call_type.as_u8()]);
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        if let Ok(pubkey_bytes) = hex::decode(&self.sender_pubkey) {
            hasher.update(&pubkey_bytes);
        }
        hasher.update(self.call.to_bytes());
        hasher.finalize().to_vec()
    }

    fn verifying_key(&self) -> Result<VerifyingKey, SignedCallError> {
        let pubkey_bytes =
            hex::decode(&self.sender_pubkey).map_err(|e| SignedCallError::InvalidPubkey(e.to_string()))?;
        let pubkey_array: [u8; 32] = pubkey_bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| SignedCallError::InvalidPubkey(format!("expected 32 bytes, got {}", bytes.len())))?;
        VerifyingKey::from_bytes(&pubkey_array).map_err(|e| SignedCallError::InvalidPubkey(e.to_string()))
    }

    /// Address the envelope claims to come from
    pub fn sender(&self) -> Result<Address, SignedCallError> {
        Ok(Address::from_verifying_key(&self.verifying_key()?))
    }

    /// Check the signature, returning the authenticated sender
    pub fn verify(&self) -> Result<Address, SignedCallError> {
        if self.call_type != self.call.call_type() {
            return Err(SignedCallError::TypeMismatch);
        }
        let verifying_key = self.verifying_key()?;

        let sig_bytes = hex::decode(&self.signature).map_err(|e| SignedCallError::InvalidSignature(e.to_string()))?;
        let sig_array: [u8; 64] = sig_bytes.try_into().map_err(|bytes: Vec<u8>| {
            SignedCallError::InvalidSignature(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        let signature = Signature::from_bytes(&sig_array);

        verifying_key
            .verify(&self.signing_bytes(), &signature)
            .map_err(|_| SignedCallError::SignatureMismatch)?;
        Ok(Address::from_verifying_key(&verifying_key))
    }

    /// Expired if stamped more than the skew tolerance in the future or
    /// older than `window_secs`
    pub fn is_expired_at(&self, now: Timestamp, window_secs: u64) -> bool {
        if self.timestamp > now.saturating_add(CLOCK_SKEW_SECS) {
            return true;
        }
        now > self.timestamp.saturating_add(window_secs)
    }

    /// Expiry + signature check
    pub fn validate(&self, now: Timestamp, window_secs: u64) -> Result<Address, SignedCallError> {
        if self.is_expired_at(now, window_secs) {
            return Err(SignedCallError::Expired {
                timestamp: self.timestamp,
                now,
            });
        }
        self.verify()
    }
}

// ============================================================================
// TESTS
// ============================================================================
