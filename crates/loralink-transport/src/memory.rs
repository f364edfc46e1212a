use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::{Buf, BytesMut};

use crate::error::{Result, TransportError};
use crate::traits::DeviceStream;

type Pipe = Arc<Mutex<BytesMut>>;

/// One end of an in-memory duplex byte stream.
///
/// Bytes written on one end become readable on the other. Used to drive a
/// session against a scripted device without hardware.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    inbound: Pipe,
    outbound: Pipe,
    closed: Arc<AtomicBool>,
}

impl MemoryStream {
    /// Create a connected pair `(host, device)`.
    pub fn pair() -> (Self, Self) {
        let a_to_b: Pipe = Arc::new(Mutex::new(BytesMut::new()));
        let b_to_a: Pipe = Arc::new(Mutex::new(BytesMut::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let host = Self {
            inbound: b_to_a.clone(),
            outbound: a_to_b.clone(),
            closed: closed.clone(),
        };
        let device = Self {
            inbound: a_to_b,
            outbound: b_to_a,
            closed,
        };
        (host, device)
    }

    /// Close both ends. Further writes fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether either end has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Take everything currently readable on this end.
    pub fn take_available(&self) -> Vec<u8> {
        let mut inbound = lock(&self.inbound);
        inbound.split().to_vec()
    }
}

impl DeviceStream for MemoryStream {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        lock(&self.outbound).extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn bytes_available(&self) -> Result<usize> {
        Ok(lock(&self.inbound).len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut inbound = lock(&self.inbound);
        let n = inbound.len().min(buf.len());
        buf[..n].copy_from_slice(&inbound[..n]);
        inbound.advance(n);
        Ok(n)
    }

    fn discard_input(&mut self) -> Result<usize> {
        let mut inbound = lock(&self.inbound);
        let n = inbound.len();
        inbound.clear();
        Ok(n)
    }
}

fn lock(pipe: &Pipe) -> MutexGuard<'_, BytesMut> {
    pipe.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_cross_between_ends() {
        let (mut host, mut device) = MemoryStream::pair();

        host.write_all(b"ping").unwrap();
        assert_eq!(device.bytes_available().unwrap(), 4);
        assert_eq!(host.bytes_available().unwrap(), 0);

        let mut buf = [0u8; 8];
        let n = device.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");

        device.write_all(b"pong").unwrap();
        assert_eq!(host.take_available(), b"pong");
    }

    #[test]
    fn partial_reads_keep_remaining_bytes() {
        let (mut host, mut device) = MemoryStream::pair();
        host.write_all(b"abcdef").unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(device.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(device.bytes_available().unwrap(), 2);
        assert_eq!(device.take_available(), b"ef");
    }

    #[test]
    fn discard_input_drops_pending_bytes() {
        let (mut host, mut device) = MemoryStream::pair();
        host.write_all(b"stale").unwrap();

        assert_eq!(device.discard_input().unwrap(), 5);
        assert_eq!(device.bytes_available().unwrap(), 0);
    }

    #[test]
    fn boxed_stream_uses_default_discard() {
        struct Counting(MemoryStream);

        impl DeviceStream for Counting {
            fn write_all(&mut self, data: &[u8]) -> Result<()> {
                self.0.write_all(data)
            }
            fn flush(&mut self) -> Result<()> {
                Ok(())
            }
            fn bytes_available(&self) -> Result<usize> {
                self.0.bytes_available()
            }
            fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
                self.0.read(buf)
            }
        }

        let (mut host, device) = MemoryStream::pair();
        host.write_all(&[7u8; 600]).unwrap();

        let mut boxed: Box<dyn DeviceStream> = Box::new(Counting(device));
        assert_eq!(boxed.discard_input().unwrap(), 600);
        assert_eq!(boxed.bytes_available().unwrap(), 0);
    }

    #[test]
    fn closed_stream_rejects_writes() {
        let (mut host, device) = MemoryStream::pair();
        device.close();
        assert!(matches!(
            host.write_all(b"x"),
            Err(TransportError::Closed)
        ));
    }
}
