use clap::Parser;
use safe_cli::commands::serve::{ServeArgs, handle_serve};
use safe_cli::{logging, messages};

/// Web front end for a serial-attached lock
#[derive(Parser)]
#[command(name = "safe", version, about)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

fn main() {
    let cli = Cli::parse();
    logging::init();

    if let Err(e) = handle_serve(cli.serve) {
        messages::print_error(
            &format!("{e:#}"),
            &[
                "Check SerialPort in the configuration file or pass --serial-port",
                "Run with DEBUG=1 for the serial exchange",
            ],
        );
        std::process::exit(1);
    }
}
