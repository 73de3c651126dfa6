use std::future::Future;

use anyhow::Result;

/// Drives `future` to completion on a current thread runtime. The runtime is abandoned instead of
/// joined afterwards: a pending stdin read sits on a blocking thread that never returns on its own.
pub fn block_on_current_thread<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::block_on_current_thread;

    #[test]
    fn test_returns_output_of_future() -> anyhow::Result<()> {
        let output = block_on_current_thread(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            7
        })?;
        assert_eq!(output, 7);
        Ok(())
    }
}
