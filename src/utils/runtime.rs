use anyhow::Result;

/// Runtime for the binary. Every task shares one cooperative event loop.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
