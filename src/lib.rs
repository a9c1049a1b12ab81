//! token_relay - Custodial Meta-Transaction Relay
//!
//! A backend that custodies user-linked wallets and moves a fungible token
//! on their behalf by submitting gas-sponsored meta-transactions to a
//! settlement network, tracking each transfer through an asynchronous,
//! failure-prone pipeline until it is final or permanently aborted.
//!
//! # Modules
//!
//! - [`relay`] - The relay engine: state machine, phase processors, locks,
//!   reconciliation, stores
//! - [`chain`] - Settlement-network boundary: client seam, JSON-RPC
//!   implementation, call encoding, custodial signer keyspace
//! - [`gateway`] - HTTP boundary: intent intake, status, wallet, health
//! - [`dispatch`] - Intake hand-off channel between gateway and engine
//! - [`config`] / [`logging`] - YAML configuration and tracing setup

pub mod chain;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod logging;
pub mod relay;

// Convenient re-exports at crate root
pub use chain::{HttpSettlement, SettlementClient, SignerProvider};
pub use dispatch::{IntakeSender, intake_channel, run_intake_loop};
pub use relay::{
    CycleReport, IntakeOutcome, IntakeService, LockManager, PartyRef, Phase, RelayContext,
    RelayError, RelayWorker, TransferIntent, TransferRecord, TxEvent, TxMachine, TxState,
};
