use std::process::ExitCode;

use clap::Parser;

use fzswitch::cli::Cli;
use fzswitch::config::Config;
use fzswitch::errors::SwitchError;


fn main() -> ExitCode {

    let cli = Cli::parse();

    let conf = match cli.config.as_deref() {
        Some(path) => match Config::load_from (path) {
            Ok(conf) => conf,
            Err(e) => {
                eprintln! ("fzswitch: {e}");
                return ExitCode::from (SwitchError::EXIT_CODE)
            }
        },
        None => Config::load(),
    };

    // we want the non-blocking log-appender guard to be here in main, so pending logs get flushed on the way out
    let _guard = conf.setup_log_subscriber (cli.log_level.as_deref());

    tracing::info! ("Starting fzswitch {} ...", Config::FZSWITCH_VERSION);

    ExitCode::from ( fzswitch::app::run (&cli, &conf) )

}
