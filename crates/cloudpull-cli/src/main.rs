#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint for the cloudpull CLI.

/// Runs the CLI and exits with its status code.
#[tokio::main]
async fn main() {
    let code = cloudpull_cli::run().await;
    std::process::exit(code);
}
