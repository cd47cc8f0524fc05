use load_audit_core::prelude::ShutdownHandle;
use tokio::signal;

/// Trigger the returned handle on Ctrl-C. Must be called from within a tokio runtime.
///
/// A running load test stops issuing new requests, in-flight requests are drained and the
/// audit is still scored and reported.
pub fn start_shutdown_listener() -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("Received shutdown signal, shutting down...");
                listener_handle.shutdown();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C, the audit cannot be interrupted: {e:?}"),
        }
    });

    handle
}
