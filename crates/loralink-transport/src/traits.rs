use crate::error::Result;

/// A bidirectional byte stream to a LoRa link device.
///
/// Reads are non-blocking from the caller's point of view: callers ask how
/// many bytes are waiting with [`bytes_available`](DeviceStream::bytes_available)
/// and then read at most that many.
pub trait DeviceStream: Send {
    /// Write the whole buffer to the device.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Flush buffered output.
    fn flush(&mut self) -> Result<()>;

    /// Number of bytes that can be read without blocking.
    fn bytes_available(&self) -> Result<usize>;

    /// Read up to `buf.len()` bytes. Returns the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Drop everything currently waiting in the input direction.
    ///
    /// Returns the number of bytes discarded.
    fn discard_input(&mut self) -> Result<usize> {
        let mut discarded = 0usize;
        let mut scratch = [0u8; 256];
        loop {
            let available = self.bytes_available()?;
            if available == 0 {
                return Ok(discarded);
            }
            let want = available.min(scratch.len());
            let read = self.read(&mut scratch[..want])?;
            if read == 0 {
                return Ok(discarded);
            }
            discarded += read;
        }
    }
}

impl<T: DeviceStream + ?Sized> DeviceStream for Box<T> {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn bytes_available(&self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn discard_input(&mut self) -> Result<usize> {
        (**self).discard_input()
    }
}
