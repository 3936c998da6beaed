use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{Arc, Mutex, PoisonError},
};

use crate::{Bet, ExchangeError, LogSink, codec::BetCodec};

use super::{
    FrameCodec, LEN_PREFIX_SIZE, Opcode, ProtocolError, ReliableTransport, ThreadPool,
    TransportError, encode_winners,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Completed submissions required before results are released.
    pub agencies: usize,
    /// Bets on this number win.
    pub winning_number: String,
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            agencies: 5,
            winning_number: "7574".to_string(),
            workers: 8,
        }
    }
}

/// Bets accepted so far and the number of agencies that finished submitting.
#[derive(Debug, Default)]
struct Ledger {
    bets: Vec<Bet>,
    finished: usize,
}

impl Ledger {
    fn winners(&self, agency: u8, number: &str) -> Vec<&str> {
        let agency = agency.to_string();
        self.bets
            .iter()
            .filter(|bet| bet.agency() == agency && bet.number() == number)
            .map(Bet::document)
            .collect()
    }
}

/// Reference lottery server speaking the agency protocol.
///
/// Each connection carries either one submission or one results request and is
/// handled on the worker pool.
pub struct LotteryServer {
    listener: TcpListener,
    ledger: Arc<Mutex<Ledger>>,
    config: Arc<ServerConfig>,
    pool: ThreadPool,
    log: LogSink,
}

impl LotteryServer {
    pub fn bind(
        address: SocketAddr,
        config: ServerConfig,
        log: LogSink,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(address)?;
        let pool = ThreadPool::new(config.workers, log.with_target("lotto::server::pool"))?;

        Ok(Self {
            listener,
            ledger: Arc::new(Mutex::new(Ledger::default())),
            config: Arc::new(config),
            pool,
            log,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn serve(self) -> Result<(), TransportError> {
        self.log
            .info(format_args!("listening at {}", self.local_addr()?));

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let ledger = Arc::clone(&self.ledger);
                    let config = Arc::clone(&self.config);
                    let log = self.log;
                    self.pool.execute(move || {
                        if let Err(e) = handle_connection(stream, &ledger, &config, log) {
                            log.warn(format_args!("connection failed: {e}"));
                        }
                    });
                }
                Err(e) => self.log.warn(format_args!("broken connection: {e:?}")),
            }
        }
        Ok(())
    }
}

fn handle_connection(
    stream: TcpStream,
    ledger: &Mutex<Ledger>,
    config: &ServerConfig,
    log: LogSink,
) -> Result<(), ExchangeError> {
    if let Ok(peer) = stream.peer_addr() {
        log.debug(format_args!("accepted connection from {peer}"));
    }
    serve_exchange(ReliableTransport::new(stream), ledger, config, log)
}

/// Runs one exchange to completion on an accepted stream.
fn serve_exchange<T: Read + Write>(
    mut transport: ReliableTransport<T>,
    ledger: &Mutex<Ledger>,
    config: &ServerConfig,
    log: LogSink,
) -> Result<(), ExchangeError> {
    let frames = FrameCodec::new();

    let code = transport.receive_byte()?;
    match Opcode::decode(code) {
        Ok(Opcode::SendingBets) => receive_bets(&mut transport, &frames, ledger, log)?,
        Ok(Opcode::RequestResults) => {
            let agency = transport.receive_byte()?;
            send_results(&mut transport, &frames, ledger, config, agency, log)?;
        }
        _ => {
            transport.send_all(&[u8::from(Opcode::Error)])?;
            return Err(ProtocolError::UnexpectedCode(code).into());
        }
    }

    transport.close()?;
    Ok(())
}

fn receive_bets<T: Read + Write>(
    transport: &mut ReliableTransport<T>,
    frames: &FrameCodec,
    ledger: &Mutex<Ledger>,
    log: LogSink,
) -> Result<(), ExchangeError> {
    let codec = BetCodec::new();
    let mut received = Vec::new();

    loop {
        let prefix = transport.receive_exact(LEN_PREFIX_SIZE)?;
        let len = frames.decode_len(&prefix)?;
        if len == 0 {
            break;
        }

        let payload = transport.receive_exact(len)?;
        match codec.deserialize_batch(&payload) {
            Ok(bets) => {
                log.debug(format_args!("batch of {} bets received", bets.len()));
                received.extend(bets);
                transport.send_all(&[u8::from(Opcode::BatchReceived)])?;
            }
            Err(e) => {
                transport.send_all(&[u8::from(Opcode::Error)])?;
                return Err(ProtocolError::MalformedBatch(e).into());
            }
        }
    }

    let mut ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
    log.info(format_args!("stored {} bets", received.len()));
    ledger.bets.extend(received);
    ledger.finished += 1;
    Ok(())
}

fn send_results<T: Read + Write>(
    transport: &mut ReliableTransport<T>,
    frames: &FrameCodec,
    ledger: &Mutex<Ledger>,
    config: &ServerConfig,
    agency: u8,
    log: LogSink,
) -> Result<(), ExchangeError> {
    let response = {
        let ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        if ledger.finished < config.agencies {
            None
        } else {
            Some(encode_winners(
                ledger.winners(agency, &config.winning_number).as_slice(),
            ))
        }
    };

    match response {
        None => {
            log.debug(format_args!("results for agency {agency} not ready"));
            transport.send_all(&[u8::from(Opcode::ResultsNotReady)])?;
        }
        Some(payload) => {
            log.info(format_args!("sending results to agency {agency}"));
            let frame = frames.tagged_frame(Opcode::SendingResults, &payload)?;
            transport.send_all(&frame)?;
        }
    }
    Ok(())
}
