//! Agency client.
//!
//! A [`Client`] drives the two phases of an agency's work against the lottery
//! server: submitting every bet from a record source, then polling for the
//! agency's winners. Each phase, and each polling attempt, runs on a fresh
//! connection obtained from the client's [`Connector`]; connections are closed
//! on every exit path.
use std::time::Duration;

use crate::{
    ExchangeError, LogSink, StopSignal,
    batch::{BatchAssembler, RecordSource},
    codec::{LineDecoder, RecordSizer},
    protocol::{Connector, ProtocolSession},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Maximum number of bets per batch.
    pub max_batch_count: usize,
    /// Wait between results requests while the server is not ready.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_batch_count: 100,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Result of polling for winners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Winners(Vec<String>),
    Cancelled,
}

pub struct Client<C: Connector> {
    connector: C,
    config: ClientConfig,
    log: LogSink,
}

impl<C: Connector> Client<C> {
    pub fn new(connector: C, config: ClientConfig, log: LogSink) -> Self {
        Self {
            connector,
            config,
            log,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn open_session(&self) -> Result<ProtocolSession<C::Stream>, ExchangeError> {
        let stream = self.connector.connect()?;
        self.log
            .debug(format_args!("connected to {}", self.connector.peer()));
        Ok(ProtocolSession::new(stream, self.log))
    }

    /// Submits every record of `source` in batches; returns the number of bets sent.
    pub fn submit_all<S, D>(&self, source: S, codec: D) -> Result<usize, ExchangeError>
    where
        S: RecordSource,
        D: RecordSizer + LineDecoder,
    {
        let mut batches = BatchAssembler::new(source, codec, self.config.max_batch_count);
        self.log.debug(format_args!(
            "batching up to {} bets / {} bytes",
            batches.max_count(),
            batches.max_bytes()
        ));

        let mut session = self.open_session()?;
        let sent = session.submit_batches(&mut batches)?;
        session.close()?;

        self.log.info(format_args!(
            "submission to {} finished",
            self.connector.peer()
        ));
        Ok(sent)
    }

    /// Requests the agency's winners until the server has them or `stop` fires.
    ///
    /// "Not ready" answers are retried forever, `poll_interval` apart, each on a
    /// new connection. Any error ends polling.
    pub fn poll_results(&self, agency: u8, stop: &StopSignal) -> Result<PollOutcome, ExchangeError> {
        let mut attempt = 0;
        loop {
            if stop.is_stopped() {
                self.log.info(format_args!("polling cancelled"));
                return Ok(PollOutcome::Cancelled);
            }

            attempt += 1;
            let mut session = self.open_session()?;
            let results = session.request_results(agency);
            let closed = session.close();

            if let Some(winners) = results? {
                closed?;
                self.log.info(format_args!(
                    "received {} winners for agency {agency} after {attempt} attempts",
                    winners.len()
                ));
                return Ok(PollOutcome::Winners(winners));
            }
            closed?;

            self.log
                .debug(format_args!("results not ready (attempt {attempt})"));
            if stop.wait_timeout(self.config.poll_interval) {
                self.log.info(format_args!("polling cancelled"));
                return Ok(PollOutcome::Cancelled);
            }
        }
    }
}
