//! Shared primitive types used across the engine.

/// A stable, unique identifier for an account in the input feed.
pub type AccountId = String;

/// Identifier of one engine invocation over a snapshot.
pub type RunId = String;

/// Upper bound of the risk score scale.
pub const MAX_RISK_SCORE: u16 = 1000;
