use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::materials::{CachedCertificate, CertificateMaterials};
use crate::{CertError, CertificateSource};

/// Refresh schedule of a [`CertificateMaterialCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long before expiry to refresh.
    pub safety_margin: Duration,
    /// Upper bound on the time between refreshes.
    pub max_refresh_horizon: Duration,
    /// Random amount subtracted from every refresh time.
    pub max_jitter: Duration,
    /// How long past expiry cached certificates are still served when
    /// refreshing fails.
    pub stale_grace: Duration,
    /// Background retry delay after a failed refresh.
    pub retry_after_failure: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            safety_margin: Duration::from_secs(24 * 60 * 60),
            max_refresh_horizon: Duration::from_secs(24 * 60 * 60),
            max_jitter: Duration::from_secs(5 * 60),
            stale_grace: Duration::from_secs(6 * 60 * 60),
            retry_after_failure: Duration::from_secs(60),
        }
    }
}

enum Refreshed {
    Fresh(Arc<CertificateMaterials>),
    Stale(Arc<CertificateMaterials>),
}

impl Refreshed {
    fn into_materials(self) -> Arc<CertificateMaterials> {
        match self {
            Self::Fresh(m) | Self::Stale(m) => m,
        }
    }
}

struct Inner {
    source: Arc<dyn CertificateSource>,
    config: CacheConfig,
    current: RwLock<Option<Arc<CertificateMaterials>>>,
    fetch_lock: Mutex<()>,
    cancel: CancellationToken,
    refresh_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Caches the service's public certificates and refreshes them in the
/// background.
///
/// Call [`warmup`](Self::warmup) once at startup. The first successful
/// fetch starts the refresh task, which runs until
/// [`shutdown`](Self::shutdown) or drop.
pub struct CertificateMaterialCache {
    inner: Arc<Inner>,
}

impl CertificateMaterialCache {
    pub fn new(source: Arc<dyn CertificateSource>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                current: RwLock::new(None),
                fetch_lock: Mutex::new(()),
                cancel: CancellationToken::new(),
                refresh_task: std::sync::Mutex::new(None),
            }),
        }
    }

    /// Loads the certificates unless they are already loaded.
    ///
    /// Concurrent first calls share a single fetch. Fails with
    /// [`CertError::CredentialUnavailable`] if nothing could be loaded.
    pub async fn warmup(&self) -> Result<Arc<CertificateMaterials>, CertError> {
        if let Some(current) = self.inner.snapshot() {
            return Ok(current);
        }

        let refreshed = {
            let _guard = self.inner.fetch_lock.lock().await;
            if let Some(current) = self.inner.snapshot() {
                return Ok(current);
            }
            self.inner
                .fetch_and_publish()
                .await
                .map_err(|e| CertError::unavailable(Some(e)))?
        };

        let materials = refreshed.into_materials();
        self.ensure_refresh_task(&materials);
        Ok(materials)
    }

    /// Fetches the certificates now, regardless of what is cached.
    ///
    /// On failure, cached certificates still within the stale grace period
    /// are returned instead of the error.
    pub async fn force_refresh(&self) -> Result<Arc<CertificateMaterials>, CertError> {
        let refreshed = {
            let _guard = self.inner.fetch_lock.lock().await;
            self.inner.fetch_and_publish().await?
        };
        let materials = refreshed.into_materials();
        self.ensure_refresh_task(&materials);
        Ok(materials)
    }

    /// Certificate used to wrap session keys.
    pub fn symmetric_key_certificate(&self) -> Result<Arc<CachedCertificate>, CertError> {
        self.inner
            .snapshot()
            .map(|m| m.symmetric_key_cert.clone())
            .ok_or_else(|| CertError::unavailable(None))
    }

    /// Certificate used to encrypt authentication tokens.
    pub fn token_certificate(&self) -> Result<Arc<CachedCertificate>, CertError> {
        self.inner
            .snapshot()
            .map(|m| m.token_cert.clone())
            .ok_or_else(|| CertError::unavailable(None))
    }

    /// Current snapshot, if any fetch has succeeded.
    pub fn materials(&self) -> Option<Arc<CertificateMaterials>> {
        self.inner.snapshot()
    }

    /// Stops the background refresh task and waits for it to exit.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handle = self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        debug!("certificate refresh task stopped");
    }

    fn ensure_refresh_task(&self, materials: &CertificateMaterials) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        let mut task = self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }
        let delay = self.inner.next_delay(materials);
        debug!(delay_secs = delay.as_secs(), "starting certificate refresh task");
        *task = Some(tokio::spawn(refresh_loop(self.inner.clone(), delay)));
    }
}

impl Drop for CertificateMaterialCache {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

impl Inner {
    fn snapshot(&self) -> Option<Arc<CertificateMaterials>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, materials: Arc<CertificateMaterials>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(materials);
    }

    /// Fetches and swaps in new materials. Callers hold `fetch_lock`.
    async fn fetch_and_publish(&self) -> Result<Refreshed, CertError> {
        let result = match self.source.fetch_public_certificates(&self.cancel).await {
            Ok(listing) => CertificateMaterials::from_listing(&listing, &self.config, Utc::now()),
            Err(e) => Err(e),
        };

        match result {
            Ok(materials) => {
                let materials = Arc::new(materials);
                self.publish(materials.clone());
                info!(
                    symmetric_key_cert = %materials.symmetric_key_cert.fingerprint(),
                    expires_at = %materials.expires_at,
                    refresh_at = %materials.refresh_at,
                    "certificates refreshed"
                );
                Ok(Refreshed::Fresh(materials))
            }
            Err(err) => match self.snapshot() {
                Some(stale) if stale.within_stale_grace(Utc::now(), self.config.stale_grace) => {
                    warn!(
                        error = %err,
                        expires_at = %stale.expires_at,
                        "certificate refresh failed, keeping cached certificates"
                    );
                    Ok(Refreshed::Stale(stale))
                }
                _ => Err(err),
            },
        }
    }

    fn next_delay(&self, materials: &CertificateMaterials) -> Duration {
        let delay = materials.until_refresh(Utc::now());
        if delay.is_zero() {
            self.config.retry_after_failure
        } else {
            delay
        }
    }
}

async fn refresh_loop(inner: Arc<Inner>, mut delay: Duration) {
    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        let outcome = {
            let _guard = inner.fetch_lock.lock().await;
            inner.fetch_and_publish().await
        };

        delay = match outcome {
            Ok(Refreshed::Fresh(materials)) => inner.next_delay(&materials),
            Ok(Refreshed::Stale(_)) => inner.config.retry_after_failure,
            Err(CertError::Cancelled) => return,
            Err(e) => {
                warn!(error = %e, "background certificate refresh failed");
                inner.config.retry_after_failure
            }
        };
        debug!(delay_secs = delay.as_secs(), "next certificate refresh scheduled");
    }
}
