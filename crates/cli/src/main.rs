use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).compact().init();
    let cli = movely_cli::Cli::parse();
    movely_cli::run(cli).await
}
