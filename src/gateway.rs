//! Persistence gateway: where the aggregate document is loaded from and
//! saved to.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::document::ConditionFormData;
use crate::error::TransportError;

/// Load/save of the whole document. Saves overwrite; last write wins.
pub trait PersistenceGateway {
    fn load(&self) -> impl Future<Output = Result<ConditionFormData, TransportError>> + Send;

    /// Stores `document` and returns the canonical stored copy
    fn save(
        &self,
        document: &ConditionFormData,
    ) -> impl Future<Output = Result<ConditionFormData, TransportError>> + Send;
}

/// Simulated network latency of the in-memory backend
#[derive(Debug, Clone)]
pub struct InMemoryGatewayConfig {
    pub load_latency: Duration,
    pub save_latency: Duration,
}

impl Default for InMemoryGatewayConfig {
    fn default() -> Self {
        Self {
            load_latency: Duration::from_millis(800),
            save_latency: Duration::from_millis(1000),
        }
    }
}

impl InMemoryGatewayConfig {
    /// No latency, for tests
    pub fn instant() -> Self {
        Self {
            load_latency: Duration::ZERO,
            save_latency: Duration::ZERO,
        }
    }
}

/// A backend that keeps the document in memory
#[derive(Debug)]
pub struct InMemoryGateway {
    config: InMemoryGatewayConfig,
    stored: Mutex<ConditionFormData>,
    reachable: AtomicBool,
    rejection: Mutex<Option<String>>,
}

impl InMemoryGateway {
    pub fn new(config: InMemoryGatewayConfig, initial: ConditionFormData) -> Self {
        Self {
            config,
            stored: Mutex::new(initial),
            reachable: AtomicBool::new(true),
            rejection: Mutex::new(None),
        }
    }

    /// Seeded with [`ConditionFormData::sample`]
    pub fn with_sample(config: InMemoryGatewayConfig) -> Self {
        Self::new(config, ConditionFormData::sample())
    }

    /// Simulates the backend going down or coming back
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes the backend refuse saves with `reason` until cleared with `None`
    pub async fn reject_saves(&self, reason: Option<String>) {
        *self.rejection.lock().await = reason;
    }

    /// The last saved copy, bypassing latency and reachability
    pub async fn snapshot(&self) -> ConditionFormData {
        self.stored.lock().await.clone()
    }

    fn check_reachable(&self, operation: &str) -> Result<(), TransportError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            warn!("{} failed: backend unreachable", operation);
            Err(TransportError::Unreachable)
        }
    }
}

impl PersistenceGateway for InMemoryGateway {
    async fn load(&self) -> Result<ConditionFormData, TransportError> {
        tokio::time::sleep(self.config.load_latency).await;
        self.check_reachable("load")?;
        let document = self.stored.lock().await.clone();
        info!(
            "loaded document with {} specific condition(s)",
            document.specific_conditions.len()
        );
        Ok(document)
    }

    async fn save(&self, document: &ConditionFormData) -> Result<ConditionFormData, TransportError> {
        // Snapshot before suspending so the save reflects the call-time state
        let incoming = document.clone();
        tokio::time::sleep(self.config.save_latency).await;
        self.check_reachable("save")?;
        if let Some(reason) = self.rejection.lock().await.clone() {
            warn!("save rejected: {}", reason);
            return Err(TransportError::Rejected(reason));
        }
        let mut stored = self.stored.lock().await;
        *stored = incoming;
        debug!("stored document {:?}", stored.general_name);
        info!("saved document");
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_returns_seeded_document() {
        let gateway = InMemoryGateway::with_sample(InMemoryGatewayConfig::instant());
        let document = gateway.load().await.unwrap();
        assert_eq!(document, ConditionFormData::sample());
    }

    #[tokio::test]
    async fn test_save_overwrites_and_returns_canonical_copy() {
        let gateway = InMemoryGateway::with_sample(InMemoryGatewayConfig::instant());
        let mut document = gateway.load().await.unwrap();
        document.general_name = "Adults".to_string();
        document.specific_conditions.clear();

        let canonical = gateway.save(&document).await.unwrap();
        assert_eq!(canonical, document);
        assert_eq!(gateway.snapshot().await, document);
        assert_eq!(gateway.load().await.unwrap(), document);
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let gateway = InMemoryGateway::with_sample(InMemoryGatewayConfig::instant());
        gateway.set_reachable(false);
        assert_eq!(gateway.load().await, Err(TransportError::Unreachable));
        assert_eq!(
            gateway.save(&ConditionFormData::default()).await,
            Err(TransportError::Unreachable)
        );
        // nothing was written
        assert_eq!(gateway.snapshot().await, ConditionFormData::sample());

        gateway.set_reachable(true);
        assert!(gateway.load().await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_save_keeps_stored_copy() {
        let gateway = InMemoryGateway::with_sample(InMemoryGatewayConfig::instant());
        gateway.reject_saves(Some("quota exceeded".to_string())).await;
        assert_eq!(
            gateway.save(&ConditionFormData::default()).await,
            Err(TransportError::Rejected("quota exceeded".to_string()))
        );
        assert_eq!(gateway.snapshot().await, ConditionFormData::sample());

        gateway.reject_saves(None).await;
        assert!(gateway.save(&ConditionFormData::default()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let gateway = InMemoryGateway::with_sample(InMemoryGatewayConfig::default());
        let started = tokio::time::Instant::now();
        gateway.load().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(800));
    }
}
