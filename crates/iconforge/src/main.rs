use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = iconforge::cli::Cli::parse();
    iconforge::init(cli.verbosity());

    iconforge::cli::run(cli).await
}
