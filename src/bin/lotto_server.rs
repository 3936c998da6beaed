use std::{error::Error, net::SocketAddr};

use clap::Parser;
use lotto::{
    LogSink,
    protocol::{LotteryServer, ServerConfig},
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Listen for new connection at address
    address: SocketAddr,
    /// Agencies that must finish submitting before results are released
    #[arg(long, default_value_t = 5)]
    agencies: usize,
    /// Winning number
    #[arg(long, default_value = "7574")]
    winning_number: String,
    /// Connection worker threads
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    workers: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = ServerConfig {
        agencies: cli.agencies,
        winning_number: cli.winning_number,
        workers: cli.workers as usize,
    };
    let server = LotteryServer::bind(cli.address, config, LogSink::global("lotto::server"))?;

    server.serve()?;
    Ok(())
}
