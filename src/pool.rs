use crate::constants;
use bytes::BytesMut;
use std::ops::{Deref, DerefMut};

/// A source of reusable working buffers for the content decoders.
///
/// Buffers are always obtained through [`PooledBuffer::acquire`], which hands
/// them back through [`release`](BufferPool::release) when dropped.
pub trait BufferPool {
    /// Returns an empty buffer with at least [`buffer_size`](BufferPool::buffer_size) bytes of capacity.
    fn allocate(&self) -> BytesMut;

    /// Takes back a buffer previously returned by [`allocate`](BufferPool::allocate).
    fn release(&self, buf: BytesMut);

    /// The number of decoded bytes collected before they are flushed to the handler.
    fn buffer_size(&self) -> usize;
}

/// A buffer borrowed from a [`BufferPool`] for the duration of one decoding call.
pub struct PooledBuffer<'a> {
    buf: BytesMut,
    pool: &'a dyn BufferPool,
}

impl<'a> PooledBuffer<'a> {
    pub fn acquire(pool: &'a dyn BufferPool) -> PooledBuffer<'a> {
        let mut buf = pool.allocate();
        buf.clear();

        PooledBuffer { buf, pool }
    }

    /// True when no more bytes fit before the next flush.
    pub fn is_full(&self) -> bool {
        self.len() >= self.pool.buffer_size()
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

/// A simple free list of fixed size buffers, safe to share between parsers.
pub struct SharedPool {
    buffer_size: usize,
    max_retained: usize,
    free: spin::Mutex<Vec<BytesMut>>,
}

impl SharedPool {
    /// Creates a pool handing out buffers of `buffer_size` bytes and keeping at most
    /// `max_retained` released buffers around for reuse.
    pub fn new(buffer_size: usize, max_retained: usize) -> SharedPool {
        SharedPool {
            buffer_size: buffer_size.max(1),
            max_retained,
            free: spin::Mutex::new(Vec::new()),
        }
    }

    /// Number of released buffers currently waiting for reuse.
    pub fn retained(&self) -> usize {
        self.free.lock().len()
    }
}

impl Default for SharedPool {
    fn default() -> Self {
        SharedPool::new(constants::DEFAULT_BUFFER_SIZE, constants::DEFAULT_RETAINED_BUFFERS)
    }
}

impl BufferPool for SharedPool {
    fn allocate(&self) -> BytesMut {
        self.free
            .lock()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.buffer_size))
    }

    fn release(&self, mut buf: BytesMut) {
        let mut free = self.free.lock();
        if free.len() < self.max_retained {
            buf.clear();
            free.push(buf);
        }
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}
