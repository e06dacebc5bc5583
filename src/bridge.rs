//! Synchronous adapter over async operations
//!
//! The orchestrator runs inside a plain synchronous UI callback, but the
//! API clients are async. [`BlockingBridge::run_blocking`] hides the
//! runtime juggling: when the calling thread already belongs to a Tokio
//! runtime, the future runs on a dedicated worker thread with its own
//! fresh runtime (blocking the caller's runtime thread on `block_on`
//! would panic); otherwise a runtime is built right here. Either way
//! exactly one runtime exists per call, it is torn down before the call
//! returns, and the result crosses back through the join handle.

use crate::{Error, Result};
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingBridge;

impl BlockingBridge {
    pub fn new() -> Self {
        Self
    }

    pub fn run_blocking<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        if Handle::try_current().is_ok() {
            tracing::debug!("Active runtime detected; running on a worker thread");
            let worker = std::thread::Builder::new()
                .name("illustchat-bridge".to_string())
                .spawn(move || -> Result<T> {
                    let runtime = Self::build_runtime()?;
                    let result = runtime.block_on(future);
                    // Runtime must be gone before the thread exits.
                    drop(runtime);
                    result
                })?;

            worker
                .join()
                .map_err(|_| Error::Invariant("Bridge worker thread panicked".to_string()))?
        } else {
            Self::build_runtime()?.block_on(future)
        }
    }

    fn build_runtime() -> Result<Runtime> {
        Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_blocking_without_active_runtime() {
        let bridge = BlockingBridge::new();
        let value = bridge.run_blocking(async { Ok(21 * 2) }).unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_blocking_inside_active_runtime() {
        let bridge = BlockingBridge::new();
        let value = bridge.run_blocking(async { Ok(21 * 2) }).unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_blocking_inside_multi_thread_runtime() {
        let bridge = BlockingBridge::new();
        let value = bridge
            .run_blocking(async {
                // Exercise a real suspension point on the fresh runtime.
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                Ok("done".to_string())
            })
            .unwrap();
        assert_eq!(value, "done");
    }

    #[test]
    fn test_run_blocking_propagates_errors() {
        let bridge = BlockingBridge::new();
        let err = bridge
            .run_blocking(async { Err::<(), _>(Error::ImageApi("down".to_string())) })
            .unwrap_err();
        assert!(matches!(err, Error::ImageApi(_)));
    }

    #[tokio::test]
    async fn test_worker_panic_becomes_error() {
        let bridge = BlockingBridge::new();
        let err = bridge
            .run_blocking(async { panic!("boom") })
            .map(|_: ()| ())
            .unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }
}
