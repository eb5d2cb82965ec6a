mod logging;
mod run;
mod settings;

use std::process::ExitCode;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    logging::setup_logging();
    let settings = settings::Settings::from_cli();
    run::run(settings).await
}
