use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;

use nad_tuner::{Args, OutputFormat, run_with_log_level};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = std::io::stdout();

    let run_result = async {
        let log_level = args.log_level();
        let output_format = args.output_format().unwrap_or(if stdout.is_terminal() {
            OutputFormat::Pretty
        } else {
            OutputFormat::Json
        });
        let tuner_config = args.tuner_config();
        let (command, backend) = args.into_command_and_backend();

        run_with_log_level(
            command,
            &mut stdout,
            backend,
            tuner_config,
            output_format,
            log_level,
        )
        .await
    }
    .await;

    match run_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
