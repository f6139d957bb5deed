//! Teller voice client binary.
//!
//! Connects the local microphone and speaker to a teller gateway session and
//! follows agent handoffs by reconnecting under the target role.

use clap::Parser;
use teller_client::{client, ClientOptions};

#[derive(Parser, Debug)]
#[command(name = "teller-client", about = "Voice client for the teller gateway")]
struct Args {
    /// Gateway base URL.
    #[arg(long, default_value = "ws://127.0.0.1:8003")]
    gateway: String,

    /// Bearer token for the authenticated account role.
    #[arg(long)]
    jwt: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    client::run(ClientOptions {
        gateway_url: args.gateway,
        jwt: args.jwt,
    })
    .await
}
