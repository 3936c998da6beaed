use std::{
    io::{self, ErrorKind, Read, Write},
    net::TcpStream,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("connection closed after {received} of {expected} bytes")]
    Closed { expected: usize, received: usize },
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// Opens connections to the lottery server.
pub trait Connector {
    type Stream: Read + Write;

    fn connect(&self) -> Result<Self::Stream, TransportError>;

    /// Human readable destination, for logs.
    fn peer(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self) -> Result<TcpStream, TransportError> {
        TcpStream::connect(&self.address).map_err(|source| TransportError::Connect {
            address: self.address.clone(),
            source,
        })
    }

    fn peer(&self) -> String {
        self.address.clone()
    }
}

/// Byte-exact delivery over a stream.
///
/// Short reads and short writes are retried until the whole buffer has moved;
/// any other failure is returned to the caller untouched.
pub struct ReliableTransport<T: Read + Write> {
    stream: T,
}

impl<T: Read + Write> ReliableTransport<T> {
    pub fn new(stream: T) -> Self {
        Self { stream }
    }

    pub fn send_all(&mut self, mut bytes: &[u8]) -> Result<(), TransportError> {
        while !bytes.is_empty() {
            match self.stream.write(bytes) {
                Ok(0) => {
                    return Err(io::Error::new(
                        ErrorKind::WriteZero,
                        "stream accepted no bytes",
                    )
                    .into());
                }
                Ok(n) => bytes = &bytes[n..],
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.stream.flush()?;
        Ok(())
    }

    pub fn receive_exact(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0; len];
        let mut received = 0;
        while received < len {
            match self.stream.read(&mut buf[received..]) {
                Ok(0) => {
                    return Err(TransportError::Closed {
                        expected: len,
                        received,
                    });
                }
                Ok(n) => received += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(buf)
    }

    pub fn receive_byte(&mut self) -> Result<u8, TransportError> {
        let buf = self.receive_exact(1)?;
        Ok(buf[0])
    }

    /// Flushes and releases the stream.
    pub fn close(mut self) -> Result<(), TransportError> {
        self.stream.flush()?;
        Ok(())
    }
}
