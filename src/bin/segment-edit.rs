//! segment-edit CLI tool
//!
//! Command-line interface for composing and refining segmentation masks
//! with the segment-edit library.

#[cfg(feature = "cli")]
use segment_edit::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
