//! Growable byte buffer with a hard size limit, and the scoped guard that
//! returns it to its pool.

use super::pool::DEFAULT_MAX_BUFFER_SIZE;
use super::{BufferError, BufferPool};
use std::fmt;
use std::ops::{Deref, DerefMut};
use zeroize::Zeroize;

/// Reusable byte buffer
///
/// Writes that would grow the buffer past its limit fail and leave the
/// contents untouched.
pub struct Buffer {
    data: Vec<u8>,
    limit: usize,
}

impl Buffer {
    /// Create an empty buffer with room for `capacity` bytes
    pub fn new(capacity: usize, limit: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity.min(limit)),
            limit,
        }
    }

    /// Append raw bytes, returning how many were written
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize, BufferError> {
        let requested = self.data.len().saturating_add(bytes.len());
        if requested > self.limit {
            return Err(BufferError::CapacityExceeded {
                limit: self.limit,
                requested,
            });
        }

        self.data.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Append a string, returning how many bytes were written
    pub fn write_str(&mut self, text: &str) -> Result<usize, BufferError> {
        self.write_bytes(text.as_bytes())
    }

    /// Wipe and clear the contents, keeping the allocation
    pub fn reset(&mut self) {
        self.data.zeroize();
    }

    /// View the written bytes
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// View the written bytes as text
    pub fn as_str(&self) -> Result<&str, BufferError> {
        std::str::from_utf8(&self.data).map_err(|_| BufferError::InvalidUtf8)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes allocated, written or not
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Maximum number of bytes this buffer accepts
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new(0, DEFAULT_MAX_BUFFER_SIZE)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Contents may hold private key PEM text
        f.debug_struct("Buffer")
            .field("len", &self.data.len())
            .field("capacity", &self.data.capacity())
            .field("limit", &self.limit)
            .finish()
    }
}

/// A buffer borrowed from a pool for the duration of a scope
///
/// The buffer goes back to the pool when the guard is dropped, whichever
/// way the scope is left.
pub struct PooledBuffer<'a> {
    pool: &'a dyn BufferPool,
    buffer: Buffer,
}

impl<'a> PooledBuffer<'a> {
    /// Acquire a buffer from `pool`
    pub fn acquire(pool: &'a dyn BufferPool) -> Self {
        let buffer = pool.acquire();
        Self { pool, buffer }
    }

    /// Return the buffer to the pool now instead of at end of scope
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        self.pool.release(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BytesPool, PoolConfig};

    #[test]
    fn test_write_and_read() {
        let mut buffer = Buffer::new(16, 1024);

        assert_eq!(buffer.write_str("-----BEGIN ").unwrap(), 11);
        assert_eq!(buffer.write_bytes(b"PUBLIC KEY").unwrap(), 10);

        assert_eq!(buffer.as_str().unwrap(), "-----BEGIN PUBLIC KEY");
        assert_eq!(buffer.len(), 21);
    }

    #[test]
    fn test_reset_keeps_allocation() {
        let mut buffer = Buffer::new(64, 1024);
        buffer.write_bytes(&[7u8; 48]).unwrap();
        let capacity = buffer.capacity();

        buffer.reset();

        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), capacity);
    }

    #[test]
    fn test_write_past_limit_fails() {
        let mut buffer = Buffer::new(4, 8);
        buffer.write_bytes(b"12345").unwrap();

        let err = buffer.write_bytes(b"6789").unwrap_err();
        assert_eq!(
            err,
            BufferError::CapacityExceeded {
                limit: 8,
                requested: 9
            }
        );

        // Failed write leaves the contents alone
        assert_eq!(buffer.bytes(), b"12345");
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buffer = Buffer::new(4, 8);
        buffer.write_bytes(&[0xff, 0xfe]).unwrap();

        assert_eq!(buffer.as_str(), Err(BufferError::InvalidUtf8));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let pool = BytesPool::new(PoolConfig::default());

        {
            let mut guard = PooledBuffer::acquire(&pool);
            guard.write_str("scoped").unwrap();
            assert_eq!(pool.stats().acquired, 1);
            assert_eq!(pool.stats().released, 0);
        }

        let stats = pool.stats();
        assert_eq!(stats.released, 1);
        assert_eq!(stats.idle, 1);
    }

    #[test]
    fn test_guard_releases_on_early_return() {
        fn fails(pool: &BytesPool) -> Result<(), BufferError> {
            let mut guard = PooledBuffer::acquire(pool);
            guard.write_bytes(&[0u8; 32])?;
            Ok(())
        }

        let pool = BytesPool::new(PoolConfig {
            max_buffer_size: 16,
            ..PoolConfig::default()
        });

        assert!(fails(&pool).is_err());
        assert_eq!(pool.stats().acquired, pool.stats().released);
    }

    #[test]
    fn test_released_buffer_comes_back_empty() {
        let pool = BytesPool::new(PoolConfig::default());

        let mut guard = PooledBuffer::acquire(&pool);
        guard.write_str("leftover").unwrap();
        guard.release();

        let guard = PooledBuffer::acquire(&pool);
        assert!(guard.is_empty());
        assert_eq!(pool.stats().allocated, 1);
    }
}
