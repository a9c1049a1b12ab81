//! Intake Dispatch Channel
//!
//! The boundary layer validates an intent, enqueues it here, and answers the
//! caller immediately; record creation happens later on the intake task.
//! Enqueue-and-later-invoke, nothing more.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::relay::error::RelayError;
use crate::relay::intake::{IntakeOutcome, IntakeService};
use crate::relay::types::TransferIntent;

/// Sender side, held by the gateway.
#[derive(Clone)]
pub struct IntakeSender {
    tx: mpsc::Sender<TransferIntent>,
}

impl IntakeSender {
    /// Hand off a validated intent without blocking the request path.
    pub fn try_enqueue(&self, intent: TransferIntent) -> Result<(), RelayError> {
        self.tx.try_send(intent).map_err(|_| RelayError::QueueFull)
    }
}

/// Receiver side, owned by the intake loop.
pub struct IntakeReceiver {
    rx: mpsc::Receiver<TransferIntent>,
}

/// Create a new intake channel pair.
pub fn intake_channel(buffer: usize) -> (IntakeSender, IntakeReceiver) {
    let (tx, rx) = mpsc::channel(buffer);
    (IntakeSender { tx }, IntakeReceiver { rx })
}

/// Drain the intake channel, creating one record per intent. Runs until
/// every sender handle is dropped.
pub async fn run_intake_loop(mut receiver: IntakeReceiver, service: Arc<IntakeService>) {
    info!("intake loop started");
    while let Some(intent) = receiver.rx.recv().await {
        let jti = intent.jti.clone();
        match service.create_from_intent(intent).await {
            Ok(IntakeOutcome::Created(id)) => {
                debug!(tx_id = %id, "intent materialized as record");
            }
            Ok(IntakeOutcome::Duplicate(id)) => {
                debug!(tx_id = %id, "intent was a duplicate, record untouched");
            }
            Err(err) => {
                // The caller already got its synchronous answer; all we can
                // do is leave a trail for the operator.
                error!(tx_id = %jti, error = %err, "failed to create transfer record");
            }
        }
    }
    info!("intake loop stopped");
}
