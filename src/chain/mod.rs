//! Settlement Network Boundary
//!
//! Everything the engine knows about the chain lives here: the narrow
//! client seam, the JSON-RPC implementation, call encoding, and the
//! custodial signer keyspace.

pub mod abi;
pub mod client;
pub mod http;
#[cfg(any(test, feature = "mock-api"))]
pub mod mock;
pub mod signer;

pub use client::{ForwardRequest, Receipt, SettlementClient, SignedForward, WaitOutcome};
pub use http::HttpSettlement;
#[cfg(any(test, feature = "mock-api"))]
pub use mock::MockChain;
pub use signer::{ChildSigner, SignerProvider};
