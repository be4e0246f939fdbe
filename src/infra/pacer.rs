use crate::app::ports::PacerPort;
use async_trait::async_trait;
use std::time::Duration;

/// Pacer that sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl PacerPort for TokioPacer {
    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
