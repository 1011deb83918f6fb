use clap::Parser;

use isoresource_cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = isoresource_server::telemetry::init_tracing_with("warn") {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match isoresource_cli::run(cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
