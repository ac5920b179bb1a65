// ============================================================================
// Truth Oracle - Assertion Source Behind the Resolution Bridge
// ============================================================================
//
// The oracle is a black box to the rest of the system: a claim goes in,
// a question id comes out, and later a settlement call yields the boolean
// verdict. Only the oracle's configured settler (the quorum wallet) may
// trigger settlement.
//
// Architecture:
//   TruthOracle trait → OptimisticOracle (in-memory reference oracle)
//   → ResolutionBridge wraps it and routes settlement through the wallet
// ============================================================================

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::accounts::Address;
use crate::clock::Timestamp;

// ============================================================================
// QUESTION ID
// ============================================================================

/// 32-byte assertion identifier, rendered as `0x` + 64 hex chars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuestionId(pub [u8; 32]);

impl QuestionId {
    pub fn from_digest(bytes: &[u8]) -> Self {
        let mut id = [0u8; 32];
        id.copy_from_slice(&bytes[..32]);
        QuestionId(id)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for QuestionId {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|_| OracleError::InvalidQuestionId(s.to_string()))?;
        if bytes.len() != 32 {
            return Err(OracleError::InvalidQuestionId(s.to_string()));
        }
        Ok(QuestionId::from_digest(&bytes))
    }
}

impl TryFrom<String> for QuestionId {
    type Error = OracleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QuestionId> for String {
    fn from(id: QuestionId) -> Self {
        id.to_string()
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("claim text must not be empty")]
    EmptyClaim,

    #[error("unknown question {0}")]
    UnknownQuestion(QuestionId),

    #[error("question {0} already settled")]
    AlreadySettled(QuestionId),

    #[error("{0} is not allowed to settle assertions")]
    Unauthorized(Address),

    #[error("invalid question id: {0}")]
    InvalidQuestionId(String),
}

impl OracleError {
    pub fn code(&self) -> &'static str {
        match self {
            OracleError::EmptyClaim => "EmptyClaim",
            OracleError::UnknownQuestion(_) => "UnknownAssertion",
            OracleError::AlreadySettled(_) => "AlreadySettled",
            OracleError::Unauthorized(_) => "Unauthorized",
            OracleError::InvalidQuestionId(_) => "InvalidQuestionId",
        }
    }
}

// ============================================================================
// ORACLE INTERFACE
// ============================================================================

/// Assert → settle surface the resolution bridge relies on
pub trait TruthOracle: Send + Sync + fmt::Debug {
    /// Address under which the oracle receives settlement calls
    fn address(&self) -> &Address;

    /// Register a claim, returning the id it will settle under
    fn assert_truth(&mut self, claim: &str, asserter: &Address, now: Timestamp) -> Result<QuestionId, OracleError>;

    /// Settle a claim. Only the configured settler may call this.
    fn settle(&mut self, caller: &Address, question_id: &QuestionId) -> Result<bool, OracleError>;
}

// ============================================================================
// OPTIMISTIC ORACLE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleClaim {
    pub claim: String,
    pub asserter: Address,
    pub asserted_at: Timestamp,
    pub settled: Option<bool>,
}

/// Reference oracle: claims settle to their configured verdict (default
/// true) once the settler calls in.
#[derive(Debug, Clone)]
pub struct OptimisticOracle {
    address: Address,
    settler: Address,
    default_verdict: bool,
    verdicts: HashMap<String, bool>,
    claims: HashMap<QuestionId, OracleClaim>,
    nonce: u64,
}

impl OptimisticOracle {
    pub fn new(address: Address, settler: Address) -> Self {
        Self {
            address,
            settler,
            default_verdict: true,
            verdicts: HashMap::new(),
            claims: HashMap::new(),
            nonce: 0,
        }
    }

    pub fn with_default_verdict(mut self, verdict: bool) -> Self {
        self.default_verdict = verdict;
        self
    }

    /// Pin the verdict for a specific claim text
    pub fn set_verdict(&mut self, claim: &str, verdict: bool) {
        self.verdicts.insert(claim.to_string(), verdict);
    }

    pub fn settler(&self) -> &Address {
        &self.settler
    }

    pub fn claim(&self, question_id: &QuestionId) -> Option<&OracleClaim> {
        self.claims.get(question_id)
    }
}

impl TruthOracle for OptimisticOracle {
    fn address(&self) -> &Address {
        &self.address
    }

    fn assert_truth(&mut self, claim: &str, asserter: &Address, now: Timestamp) -> Result<QuestionId, OracleError> {
        if claim.trim().is_empty() {
            return Err(OracleError::EmptyClaim);
        }

        let mut hasher = Sha256::new();
        hasher.update(claim.as_bytes());
        hasher.update(asserter.as_str().as_bytes());
        hasher.update(now.to_be_bytes());
        hasher.update(self.nonce.to_be_bytes());
        let question_id = QuestionId::from_digest(&hasher.finalize());
        self.nonce += 1;

        self.claims.insert(
            question_id,
            OracleClaim {
                claim: claim.to_string(),
                asserter: asserter.clone(),
                asserted_at: now,
                settled: None,
            },
        );
        tracing::debug!(%question_id, asserter = %asserter.short(), "🔮 claim asserted");
        Ok(question_id)
    }

    fn settle(&mut self, caller: &Address, question_id: &QuestionId) -> Result<bool, OracleError> {
        if caller != &self.settler {
            tracing::warn!(caller = %caller.short(), %question_id, "settlement attempt from non-settler");
            return Err(OracleError::Unauthorized(caller.clone()));
        }
        let default_verdict = self.default_verdict;
        let record = self
            .claims
            .get_mut(question_id)
            .ok_or(OracleError::UnknownQuestion(*question_id))?;
        if record.settled.is_some() {
            return Err(OracleError::AlreadySettled(*question_id));
        }
        let verdict = self
            .verdicts
            .get(&record.claim)
            .copied()
            .unwrap_or(default_verdict);
        record.settled = Some(verdict);
        tracing::info!(%question_id, verdict, "🔮 claim settled");
        Ok(verdict)
    }
}
