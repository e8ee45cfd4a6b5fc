use clap::Parser;
use tracing::error;

use minikv::server::Server;

/// An in-memory key-value server speaking the RESP protocol.
#[derive(Parser, Debug)]
struct Args {
    /// The port to listen on
    #[arg(long, default_value_t = 6379)]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let server = match Server::bind(("0.0.0.0", args.port)).await {
        Ok(server) => server,
        Err(err) => {
            error!("failed to bind to port {}: {}", args.port, err);
            std::process::exit(1);
        }
    };

    if let Err(err) = server.run().await {
        error!("failed to accept connection: {}", err);
        std::process::exit(1);
    }
}
