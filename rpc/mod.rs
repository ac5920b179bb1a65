// ============================================================================
// RPC Module - Authenticated Calls
// ============================================================================
//
// Components:
//   - signed_call: Ed25519 signed call envelopes for every state-changing
//     market, wallet and bridge operation
//
// ============================================================================

pub mod signed_call;

pub use signed_call::*;
