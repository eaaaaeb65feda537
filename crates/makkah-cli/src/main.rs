//! `makkah` binary entrypoint.

#[tokio::main]
async fn main() {
    let code = makkah_cli::run().await;
    std::process::exit(code);
}
