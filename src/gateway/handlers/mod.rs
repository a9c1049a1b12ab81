//! Gateway Handlers

pub mod health;
#[cfg(feature = "mock-api")]
pub mod process;
pub mod status;
pub mod transfer;
pub mod wallet;

pub use health::health;
#[cfg(feature = "mock-api")]
pub use process::run_process;
pub use status::{transfer_status, user_transfers};
pub use transfer::submit_transfer;
pub use wallet::wallet_address;
