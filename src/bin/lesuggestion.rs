// lesuggestion binary entry point

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lesuggestion::cli::main().await
}
