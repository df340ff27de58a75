//! # Admission Gateway
//!
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! The front door of the ledger node. Receives signed transactions and
//! read queries from the RPC layer, validates and admits them, hands
//! accepted transactions to the Consensus Substrate, and answers read
//! queries against a replicated State View snapshot.
//!
//! Consensus itself, the replicated store, signature cryptography, the
//! fee schedule, and the RPC transport live behind outbound ports.
//!
//! ## Pipeline Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Precheck failures touch no downstream stage | `router.rs` - `submit_inner()` short-circuit |
//! | INVARIANT-2 | Throttle tokens stay in `[0, capacity]` | `domain/throttle.rs` - lazy refill clamp |
//! | INVARIANT-3 | At most one in-flight entry per transaction id | `service/submission.rs` - sharded insert check |
//! | INVARIANT-4 | Collaborator errors never cross the router | `router.rs` - `FailInvalid` downgrade |
//!
//! ## Outbound Dependencies
//!
//! | Collaborator | Trait | Purpose |
//! |--------------|-------|---------|
//! | State View | `StateView` / `StateSnapshot` | Account/contract/file reads |
//! | Consensus Substrate | `ConsensusSubstrate` | Transaction handoff |
//! | Signature service | `SignatureVerifier` | Key/signature checks |
//! | Fee schedule | `FeeSchedule` | Minimum fee computation |
//! | Clock | `TimeSource` | Deterministic time in tests |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  router.rs - AdmissionGateway composition + error boundary      │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/outbound.rs - StateView, ConsensusSubstrate,             │
//! │                      SignatureVerifier, FeeSchedule, TimeSource │
//! │  service/          - SemanticValidator, SubmissionCoordinator,  │
//! │                      AnswerEngine                               │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/types.rs      - Functionality, IncomingTransaction      │
//! │  domain/precheck.rs   - stateless structural checks             │
//! │  domain/throttle.rs   - token-bucket admission                  │
//! │  domain/duplicates.rs - recent-transaction window               │
//! │  domain/response.rs   - ResponseCode + envelope codec           │
//! │  domain/errors.rs     - CollaboratorError                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod domain;
pub mod ports;
pub mod router;
pub mod service;

pub use domain::*;
pub use router::*;
