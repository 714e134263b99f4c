use std::process::ExitCode;

use rabbitpub::{AmqpBroker, Cli, telemetry};

fn main() -> ExitCode {
    telemetry::init();

    let cli = Cli::parse_normalized(std::env::args_os());
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(rabbitpub::run(&config, &AmqpBroker::new())) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
