use tokio::select;
use tokio_util::sync::CancellationToken;

/// Translates Ctrl-C into a cancellation of `cancelation`.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}
