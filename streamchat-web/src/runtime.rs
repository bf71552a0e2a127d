//! Timer and task spawning for the browser and native targets.

use std::{future::Future, time::Duration};

#[cfg(target_arch = "wasm32")]
pub async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await;
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Runs `future` on the current thread's executor.
///
/// Natively this must be called inside a `tokio::task::LocalSet`.
#[cfg(target_arch = "wasm32")]
pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

/// Runs `future` on the current thread's executor.
///
/// Natively this must be called inside a `tokio::task::LocalSet`.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    drop(tokio::task::spawn_local(future));
}
