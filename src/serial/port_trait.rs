//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialPort;

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Drop any bytes already waiting in the input buffer
    fn discard_input(&mut self) -> io::Result<()>;

    /// Read up to `len` bytes, giving up once `timeout` has elapsed
    ///
    /// Returns whatever arrived before the deadline, which may be fewer than
    /// `len` bytes (or none) when the device is slow or silent.
    async fn read_up_to(&mut self, len: usize, timeout: Duration) -> io::Result<Vec<u8>>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port.flush().await
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.port
            .clear(tokio_serial::ClearBuffer::Input)
            .map_err(io::Error::from)
    }

    async fn read_up_to(&mut self, len: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        let deadline = tokio::time::Instant::now() + timeout;

        while filled < len {
            match tokio::time::timeout_at(deadline, self.port.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => break,
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock serial port that answers each request with the next scripted reply
    ///
    /// An exhausted script behaves like a silent device (empty reads).
    #[derive(Clone)]
    pub struct MockSerialPort {
        pub written_data: Arc<Mutex<Vec<Vec<u8>>>>,
        pub replies: Arc<Mutex<VecDeque<Vec<u8>>>>,
        pub write_error: Arc<Mutex<Option<io::ErrorKind>>>,
        pub discard_count: Arc<Mutex<usize>>,
    }

    impl MockSerialPort {
        pub fn new() -> Self {
            Self {
                written_data: Arc::new(Mutex::new(Vec::new())),
                replies: Arc::new(Mutex::new(VecDeque::new())),
                write_error: Arc::new(Mutex::new(None)),
                discard_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn with_replies(replies: Vec<Vec<u8>>) -> Self {
            let mock = Self::new();
            *mock.replies.lock().unwrap() = replies.into();
            mock
        }

        pub fn push_reply(&self, reply: Vec<u8>) {
            self.replies.lock().unwrap().push_back(reply);
        }

        pub fn get_written_data(&self) -> Vec<Vec<u8>> {
            self.written_data.lock().unwrap().clone()
        }

        pub fn set_write_error(&self, error: io::ErrorKind) {
            *self.write_error.lock().unwrap() = Some(error);
        }

        pub fn discards(&self) -> usize {
            *self.discard_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl SerialPortIO for MockSerialPort {
        async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            if let Some(error) = *self.write_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock write error"));
            }
            self.written_data.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn discard_input(&mut self) -> io::Result<()> {
            *self.discard_count.lock().unwrap() += 1;
            Ok(())
        }

        async fn read_up_to(&mut self, len: usize, _timeout: Duration) -> io::Result<Vec<u8>> {
            let mut reply = self.replies.lock().unwrap().pop_front().unwrap_or_default();
            reply.truncate(len);
            Ok(reply)
        }
    }
}
