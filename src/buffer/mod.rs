//! Buffer Module - Reusable byte buffers for string building
//!
//! Key serialization borrows a buffer from a shared pool, writes PEM text into
//! it and hands it back. Pooling only saves allocations; the guard in
//! [`PooledBuffer`] makes sure every borrowed buffer goes back exactly once.

mod bytes;
mod pool;

pub use bytes::{Buffer, PooledBuffer};
pub use pool::{BytesPool, ConfigError, PoolConfig, PoolStats};

use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Buffer capacity exceeded: limit {limit} bytes, requested {requested}")]
    CapacityExceeded { limit: usize, requested: usize },

    #[error("Buffer contents are not valid UTF-8")]
    InvalidUtf8,
}

/// Source of reusable byte buffers.
///
/// `acquire` must never return a buffer that another caller still holds.
/// Buffers are moved into `release`, so a buffer cannot be released twice.
pub trait BufferPool: Send + Sync {
    /// Take a buffer out of the pool (or allocate a fresh one)
    fn acquire(&self) -> Buffer;

    /// Hand a buffer back for reuse
    fn release(&self, buffer: Buffer);
}

/// Shared handle to a pool, as stored by key pairs
pub type SharedPool = Arc<dyn BufferPool>;
