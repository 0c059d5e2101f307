use clap::Parser;
use homecalc::api::{Cli, Command, init_tracing, run_compute, run_http_server};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_filter);

    let outcome = match cli.command {
        Command::Serve { host, port } => run_http_server(&host, port).await,
        Command::Compute { input, pretty } => {
            run_compute(&input, pretty).await.map(|out| println!("{out}"))
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
