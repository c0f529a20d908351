use color_eyre::eyre::WrapErr;
use tokio::io::{self, AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// HTTP plumbing is chatty at INFO; only hear from it when something breaks.
const QUIET_CRATES: [&str; 3] = ["hyper=warn", "reqwest=warn", "teloxide=warn"];

pub fn pre_flight() -> color_eyre::Result<()> {
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    for directive in QUIET_CRATES {
        env_filter = env_filter.add_directive(directive.parse()?);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(console_subscriber::spawn())
        .with(tracing_error::ErrorLayer::default())
        .init();
    color_eyre::install()?;

    Ok(())
}

/// Streams `input` into `output` and flushes, so the bytes are on disk by the
/// time this returns.
pub async fn drain_into<I, O>(mut input: I, mut output: O) -> color_eyre::Result<u64>
where
    I: AsyncRead + Unpin + Send,
    O: AsyncWrite + Unpin + Send,
{
    let bytes = io::copy(&mut input, &mut output)
        .await
        .wrap_err("failed to copy bytes")?;
    output.flush().await.wrap_err("failed to flush output")?;
    Ok(bytes)
}
