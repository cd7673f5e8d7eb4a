use std::process;

use shelfmark::{application::error::AppError, config, infra::telemetry};
use tracing::{dispatcher, error};

mod cli;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    eprintln!("error: {}", error.user_message());
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
    }
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let ctx = cli::Ctx::from_settings(&settings)?;
    cli::dispatch(&ctx, cli_args.command).await
}
