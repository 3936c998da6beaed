use std::{error::Error, fs::File, io::BufReader, path::PathBuf, time::Duration};

use clap::Parser;
use lotto::{
    Client, ClientConfig, LogSink, PollOutcome, StopSignal, batch::LineSource, codec::BetCodec,
    protocol::TcpConnector,
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Agency id; travels as a single byte, so at most 255
    #[arg(long, env = "CLI_ID")]
    id: u8,
    /// Address of the lottery server
    #[arg(long, env = "SERVER_ADDRESS", default_value = "127.0.0.1:12345")]
    server: String,
    /// File with one bet per line
    #[arg(long, env = "CLI_DATA_FILE")]
    data: PathBuf,
    /// Maximum number of bets per batch
    #[arg(
        long,
        env = "CLI_BATCH_MAXAMOUNT",
        default_value_t = 100,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    batch_max_amount: u32,
    /// Milliseconds between results requests
    #[arg(long, env = "CLI_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,
    /// Data file lines omit the agency column; use `--id` instead
    #[arg(long)]
    prepend_agency: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let log = LogSink::global("lotto::client");

    let outcome = run(cli, log, |stop| {
        ctrlc::set_handler(move || stop.stop())?;
        Ok(())
    })?;
    match outcome {
        PollOutcome::Winners(winners) => {
            for winner in winners {
                println!("{winner}");
            }
        }
        PollOutcome::Cancelled => log.info(format_args!("stopped before results arrived")),
    }

    Ok(())
}

/// Submits the data file, then polls for the agency's winners.
///
/// `install_stop` hooks the stop signal to the process' interrupt handling.
/// It runs only once submission is over, so an interrupt during submission
/// still terminates the process.
fn run<F>(cli: Cli, log: LogSink, install_stop: F) -> Result<PollOutcome, Box<dyn Error>>
where
    F: FnOnce(StopSignal) -> Result<(), Box<dyn Error>>,
{
    let source = LineSource::new(BufReader::new(File::open(&cli.data)?));
    let codec = if cli.prepend_agency {
        BetCodec::with_agency(cli.id.to_string())
    } else {
        BetCodec::new()
    };

    let config = ClientConfig {
        max_batch_count: cli.batch_max_amount as usize,
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
    };
    let client = Client::new(TcpConnector::new(cli.server), config, log);

    client.submit_all(source, codec)?;

    let stop = StopSignal::new();
    install_stop(stop.clone())?;
    Ok(client.poll_results(cli.id, &stop)?)
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{Read, Write},
        net::TcpListener,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
    };

    use tempdir::TempDir;

    use super::*;

    #[test]
    fn stop_handler_installed_after_submission() {
        let temp = TempDir::new("lotto_client").unwrap();
        let data = temp.path().join("agency-3.csv");
        fs::write(&data, "Bob,Lee,123,1990-01-01,7\n").unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let installed = Arc::new(AtomicBool::new(false));

        let seen = Arc::clone(&installed);
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut header = [0u8; 3];
            conn.read_exact(&mut header).unwrap();
            let mut payload = vec![0u8; usize::from(u16::from_be_bytes([header[1], header[2]]))];
            conn.read_exact(&mut payload).unwrap();
            let during_batch = seen.load(Ordering::SeqCst);
            conn.write_all(&[1]).unwrap();
            let mut completion = [0u8; 2];
            conn.read_exact(&mut completion).unwrap();

            let (mut conn, _) = listener.accept().unwrap();
            let mut request = [0u8; 2];
            conn.read_exact(&mut request).unwrap();
            conn.write_all(&[4, 0, 3, b'1', b'2', b'3']).unwrap();

            (during_batch, payload, completion, request)
        });

        let cli = Cli {
            id: 3,
            server: address,
            data,
            batch_max_amount: 100,
            poll_interval_ms: 10,
            prepend_agency: true,
        };
        let flag = Arc::clone(&installed);
        let outcome = run(cli, LogSink::global("lotto::client"), move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        let (during_batch, payload, completion, request) = server.join().unwrap();
        assert!(!during_batch);
        assert!(installed.load(Ordering::SeqCst));
        assert_eq!(payload, b"3|Bob|Lee|123|1990-01-01|7");
        assert_eq!(completion, [0, 0]);
        assert_eq!(request, [2, 3]);
        assert_eq!(outcome, PollOutcome::Winners(vec!["123".to_string()]));
    }

    #[test]
    fn submission_failure_skips_stop_handler() {
        let temp = TempDir::new("lotto_client").unwrap();
        let data = temp.path().join("agency-1.csv");
        fs::write(&data, "A,Bob,Lee,123,1990-01-01,7\n").unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let cli = Cli {
            id: 1,
            server: address,
            data,
            batch_max_amount: 100,
            poll_interval_ms: 10,
            prepend_agency: false,
        };
        let res = run(cli, LogSink::global("lotto::client"), |_| {
            panic!("stop handler installed before submission finished")
        });
        assert!(res.is_err());
    }
}
