use std::sync::Arc;

use anyhow::Result;
use clap::Parser as _;
use mini_rag_cli::{
    AppState, ServerConfig, Settings, app,
    cli::{Cli, Command},
    run_server, telemetry,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    telemetry::init(&settings.log_level, cli.pipeline.log_file.as_deref())?;
    info!(settings = %settings, "starting {}", settings.app_name);

    let pipeline = app::build_pipeline(&cli.pipeline, &settings).await?;

    match cli.command {
        Command::Ask { question } => {
            let answer = pipeline.ask(&question).await?.into_answer();
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Command::Serve { host, port } => {
            let state = AppState { pipeline: Arc::new(pipeline), app_name: settings.app_name.into() };
            run_server(state, ServerConfig { host, port }).await?;
        }
    }

    Ok(())
}
