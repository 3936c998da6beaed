//! Test doubles for streams, connectors and loggers.
use std::{
    collections::VecDeque,
    io::{self, Cursor, Read, Write},
    sync::{Arc, Mutex},
};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::protocol::{Connector, TransportError};

/// In-memory stream replaying canned replies and recording what is written.
///
/// Reads and writes move at most `chunk` bytes per call to exercise short
/// reads and writes, and the first `interrupts` reads and writes each fail
/// with [`io::ErrorKind::Interrupted`]. Clones share the same buffers.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedStream {
    input: Arc<Mutex<Cursor<Vec<u8>>>>,
    output: Arc<Mutex<Vec<u8>>>,
    chunk: usize,
    read_interrupts: Arc<Mutex<usize>>,
    write_interrupts: Arc<Mutex<usize>>,
}

impl ScriptedStream {
    pub fn new(replies: Vec<u8>) -> Self {
        Self {
            input: Arc::new(Mutex::new(Cursor::new(replies))),
            output: Arc::new(Mutex::new(Vec::new())),
            chunk: usize::MAX,
            read_interrupts: Arc::default(),
            write_interrupts: Arc::default(),
        }
    }

    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    pub fn with_interrupts(self, interrupts: usize) -> Self {
        *self.read_interrupts.lock().unwrap() = interrupts;
        *self.write_interrupts.lock().unwrap() = interrupts;
        self
    }

    /// Interrupts not yet delivered, as `(reads, writes)`.
    pub fn pending_interrupts(&self) -> (usize, usize) {
        (
            *self.read_interrupts.lock().unwrap(),
            *self.write_interrupts.lock().unwrap(),
        )
    }

    pub fn output(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.output)
    }

    pub fn written(&self) -> Vec<u8> {
        self.output.lock().unwrap().clone()
    }
}

fn interrupt(remaining: &Mutex<usize>) -> io::Result<()> {
    let mut remaining = remaining.lock().unwrap();
    if *remaining > 0 {
        *remaining -= 1;
        return Err(io::Error::from(io::ErrorKind::Interrupted));
    }
    Ok(())
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        interrupt(&self.read_interrupts)?;
        let len = buf.len().min(self.chunk);
        self.input.lock().unwrap().read(&mut buf[..len])
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        interrupt(&self.write_interrupts)?;
        let len = buf.len().min(self.chunk);
        self.output.lock().unwrap().extend_from_slice(&buf[..len]);
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hands out one [`ScriptedStream`] per connection.
///
/// Replies are consumed in order; once exhausted, `repeat` (if any) answers
/// every further connection, otherwise connecting fails.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedConnector {
    replies: Arc<Mutex<VecDeque<Vec<u8>>>>,
    repeat: Option<Vec<u8>>,
    streams: Arc<Mutex<Vec<ScriptedStream>>>,
}

impl ScriptedConnector {
    pub fn new(replies: Vec<Vec<u8>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            repeat: None,
            streams: Arc::default(),
        }
    }

    pub fn repeating(reply: Vec<u8>) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::new(Vec::new())
        }
    }

    /// Bytes written on each connection, in connection order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .map(ScriptedStream::written)
            .collect()
    }
}

impl Connector for ScriptedConnector {
    type Stream = ScriptedStream;

    fn connect(&self) -> Result<ScriptedStream, TransportError> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .ok_or_else(|| TransportError::Connect {
                address: self.peer(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            })?;

        let stream = ScriptedStream::new(reply).with_chunk(2);
        self.streams.lock().unwrap().push(stream.clone());
        Ok(stream)
    }

    fn peer(&self) -> String {
        "scripted".to_string()
    }
}

/// Logger that keeps every enabled record in memory.
pub(crate) struct CaptureLog {
    filter: LevelFilter,
    entries: Mutex<Vec<(Level, String, String)>>,
}

impl CaptureLog {
    pub fn leak(filter: LevelFilter) -> &'static CaptureLog {
        Box::leak(Box::new(CaptureLog {
            filter,
            entries: Mutex::new(Vec::new()),
        }))
    }

    pub fn entries(&self) -> Vec<(Level, String, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, _, m)| m).collect()
    }
}

impl Log for CaptureLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.entries.lock().unwrap().push((
                record.level(),
                record.target().to_string(),
                record.args().to_string(),
            ));
        }
    }

    fn flush(&self) {}
}
