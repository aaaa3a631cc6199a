//! Escalation Policy — deterministic gate in front of the deep layer
//!
//! Looks at the most recent events plus whatever the cheap layers said and
//! decides whether the expensive layer is worth running. No model calls
//! happen here; whether the call is actually *admitted* is the admission
//! controller's job.
//!
//! ```text
//! recent 20 events ──► high value?  ─┐
//! heuristic vs fast ─► disagree?    ─┼─ OR ─► should_invoke
//! heuristic & fast ──► low conf?    ─┘
//! ```

pub mod policy;

pub use policy::{EscalationConfig, EscalationDecision, EscalationPolicy, EscalationReasons};
