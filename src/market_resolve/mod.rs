// ============================================================================
// Market Resolve Module - Binary Markets from Creation to Settlement
// ============================================================================
//
// This module contains the prediction market core:
//   - pricing: pool-ratio pricing and purchase quotes
//   - markets: market records, sides, states and the persisted layout
//   - engine: the MarketEngine driving every market through its lifecycle
//
// ============================================================================

pub mod engine;
pub mod markets;
pub mod pricing;

pub use engine::{BurnReport, EngineConfig, MarketEngine, MarketError, Purchase};
pub use markets::{Market, MarketId, MarketRecord, MarketState, Position, PositionRecord, Settlement, Side};
pub use pricing::{Pools, Quote, BPS_DENOMINATOR, DEFAULT_FEE_RATE_BPS};
