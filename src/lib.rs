/// Quorum Market - binary prediction markets settled through a quorum wallet
/// Exports all modules for use as a library crate

pub mod accounts;
pub mod app_state;
pub mod bridge;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod market_resolve;
pub mod models;
pub mod oracle;
pub mod quorum;
pub mod shares;

#[path = "../rpc/mod.rs"]
pub mod rpc;

// Re-export from market_resolve (market lifecycle)
pub use market_resolve::{
    BurnReport, EngineConfig, Market, MarketEngine, MarketError, MarketId, MarketRecord, MarketState,
    Pools, Position, Purchase, Settlement, Side, BPS_DENOMINATOR, DEFAULT_FEE_RATE_BPS,
};

// Re-export from quorum (n-of-m wallet)
pub use quorum::{
    CallError, CallPayload, CallTarget, QuorumTransaction, QuorumWallet, TxId, WalletConfig, WalletError,
    DEFAULT_COOLDOWN_SECS,
};

pub use accounts::{Account, AccountInfo, Address, DevAccounts};
pub use app_state::{AppState, CallOutcome, SharedState};
pub use bridge::{Assertion, AssertionStatus, AssertionTicket, BridgeError, ResolutionBridge};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock, Timestamp};
pub use config::{AppConfig, ConfigError};
pub use error::ApiError;
pub use events::{Event, EventLog, LogEntry};
pub use ledger::{units, Amount, Ledger, LedgerError, TxType, UNIT};
pub use oracle::{OptimisticOracle, OracleError, QuestionId, TruthOracle};
pub use rpc::{CallRequest, CallType, SignedCall, SignedCallError, TX_EXPIRY_SECS};
pub use shares::{ShareClassId, ShareError, ShareLedger, SharesManager};
