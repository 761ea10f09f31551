use std::future::Future;

use gust_core::prelude::{ShutdownHandle, ShutdownSignalError};

/// Wraps the Tokio runtime that all async work in a run goes through.
///
/// Hooks are plain synchronous functions, so anything async they need, like an HTTP request,
/// is submitted here from the VU thread.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking the calling thread until it completes.
    ///
    /// The future is raced against the run's shutdown signal, so a hook blocked on a slow
    /// request unblocks as soon as the run ends and gets a [ShutdownSignalError] back. A
    /// future that cannot be cancelled holds up shutdown until it resolves.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Submit async code to be run in the background.
    ///
    /// The future is not cancelled when the runner shuts down and the runner will not wait for
    /// it to complete. In behaviour hooks prefer [Executor::execute_in_place] so that the work
    /// completes before the iteration is counted as finished.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_executor() -> (Executor, ShutdownHandle) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let handle = ShutdownHandle::default();
        (Executor::new(runtime, handle.clone()), handle)
    }

    #[test]
    fn completes_work_and_returns_the_value() {
        let (executor, _handle) = test_executor();

        let value = executor
            .execute_in_place(async { Ok::<_, anyhow::Error>(21 * 2) })
            .unwrap();

        assert_eq!(value, 42);
    }

    #[test]
    fn in_flight_work_is_cancelled_on_shutdown() {
        let (executor, handle) = test_executor();

        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.shutdown();
        });

        let result = executor.execute_in_place(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, anyhow::Error>(())
        });

        assert!(result.unwrap_err().is::<ShutdownSignalError>());
    }
}
