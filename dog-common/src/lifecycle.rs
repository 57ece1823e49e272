use std::ops::{Deref, DerefMut};

use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broker::Release;

/// Owns a [`Release`] resource and releases it exactly once: either through
/// [`ReleaseGuard::release`] or, on any other exit path, when dropped.
pub struct ReleaseGuard<T: Release> {
    inner: Option<T>,
}

impl<T: Release> ReleaseGuard<T> {
    pub fn new(inner: T) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn release(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.release();
        }
    }
}

impl<T: Release> Deref for ReleaseGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `release` and `drop` take the value, and both consume the guard
        self.inner.as_ref().expect("guard already released")
    }
}

impl<T: Release> DerefMut for ReleaseGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner.as_mut().expect("guard already released")
    }
}

impl<T: Release> Drop for ReleaseGuard<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            warn!("releasing broker resources on unwind");
            inner.release();
        }
    }
}

/// Resolves on the first SIGINT or SIGTERM.
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = match tokio::signal::unix::signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler, only listening for SIGINT");
            if ctrl_c.await.is_ok() {
                info!("received SIGINT");
            }
            return;
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}

/// A token that is cancelled once the process is asked to stop.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        trigger.cancel();
    });
    token
}
