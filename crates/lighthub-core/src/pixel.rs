//! Pixel buffers
//!
//! A [`PixelBuffer`] holds the colors of one physical strip. Writers take
//! an exclusive [`PixelGuard`] with [`PixelBuffer::acquire`]; releasing the
//! guard hands the final contents to the buffer's [`FlushHook`], which is
//! where transmission to the device happens.

use crate::{Color, PixelError};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Receives buffer contents each time a guard is released
pub trait FlushHook: Send + Sync {
    fn flush(&self, pixels: &[Color]);
}

/// Fixed-size strip contents with acquire/release access
pub struct PixelBuffer {
    pixels: Mutex<Vec<Color>>,
    size: usize,
    hook: Option<Arc<dyn FlushHook>>,
    flushes: AtomicU64,
}

impl PixelBuffer {
    /// Create a black buffer with no flush hook
    pub fn new(size: usize) -> Self {
        Self {
            pixels: Mutex::new(vec![Color::BLACK; size]),
            size,
            hook: None,
            flushes: AtomicU64::new(0),
        }
    }

    /// Create a black buffer that flushes through `hook`
    pub fn with_hook(size: usize, hook: Arc<dyn FlushHook>) -> Self {
        Self {
            hook: Some(hook),
            ..Self::new(size)
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Take exclusive access.
    ///
    /// Fails with [`PixelError::AlreadyAcquired`] instead of waiting when a
    /// guard is alive, including one held by the calling thread.
    pub fn acquire(&self) -> Result<PixelGuard<'_>, PixelError> {
        let pixels = self.pixels.try_lock().ok_or(PixelError::AlreadyAcquired)?;
        Ok(PixelGuard {
            buffer: self,
            pixels: Some(pixels),
        })
    }

    /// Whether a guard is currently alive
    pub fn is_acquired(&self) -> bool {
        self.pixels.is_locked()
    }

    /// Copy of the current contents. Waits for any active guard.
    pub fn snapshot(&self) -> Vec<Color> {
        self.pixels.lock().clone()
    }

    /// Number of completed acquire/release pairs
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Acquire)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("size", &self.size)
            .field("acquired", &self.is_acquired())
            .field("flushes", &self.flush_count())
            .finish()
    }
}

/// Exclusive write access to a [`PixelBuffer`].
///
/// Dropping the guard releases it; [`PixelGuard::release`] does the same
/// explicitly. Either way the flush hook runs exactly once, after the lock
/// has been dropped. Guards released on different threads can therefore
/// reach the hook in a different order than they released the lock; a
/// single writer per buffer sees its frames in order.
pub struct PixelGuard<'a> {
    buffer: &'a PixelBuffer,
    pixels: Option<MutexGuard<'a, Vec<Color>>>,
}

impl<'a> PixelGuard<'a> {
    pub fn len(&self) -> usize {
        self.buffer.size
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.size == 0
    }

    pub fn get(&self, index: usize) -> Result<Color, PixelError> {
        self.as_slice()
            .get(index)
            .copied()
            .ok_or(PixelError::IndexOutOfRange {
                index,
                size: self.buffer.size,
            })
    }

    pub fn set(&mut self, index: usize, color: Color) -> Result<(), PixelError> {
        let size = self.buffer.size;
        let slot = self
            .as_mut_slice()
            .get_mut(index)
            .ok_or(PixelError::IndexOutOfRange { index, size })?;
        *slot = color;
        Ok(())
    }

    pub fn fill(&mut self, color: Color) {
        self.as_mut_slice().fill(color);
    }

    /// Shift every pixel `mid` places toward index 0, wrapping the head to
    /// the tail
    pub fn rotate_left(&mut self, mid: usize) {
        let pixels = self.as_mut_slice();
        if !pixels.is_empty() {
            let mid = mid % pixels.len();
            pixels.rotate_left(mid);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Color> {
        self.as_slice().iter()
    }

    pub fn as_slice(&self) -> &[Color] {
        self.pixels.as_deref().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn as_mut_slice(&mut self) -> &mut [Color] {
        self.pixels
            .as_deref_mut()
            .map(Vec::as_mut_slice)
            .unwrap_or(&mut [])
    }

    /// Release the buffer and flush its contents
    pub fn release(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        let Some(pixels) = self.pixels.take() else {
            return;
        };
        let contents = pixels.clone();
        drop(pixels);

        let count = self.buffer.flushes.fetch_add(1, Ordering::AcqRel) + 1;
        trace!("Flushing {} pixels (frame {})", contents.len(), count);
        if let Some(hook) = &self.buffer.hook {
            hook.flush(&contents);
        }
    }
}

impl Index<usize> for PixelGuard<'_> {
    type Output = Color;

    fn index(&self, index: usize) -> &Color {
        let size = self.buffer.size;
        self.as_slice()
            .get(index)
            .unwrap_or_else(|| panic!("pixel index {index} out of range (size {size})"))
    }
}

impl IndexMut<usize> for PixelGuard<'_> {
    fn index_mut(&mut self, index: usize) -> &mut Color {
        let size = self.buffer.size;
        self.as_mut_slice()
            .get_mut(index)
            .unwrap_or_else(|| panic!("pixel index {index} out of range (size {size})"))
    }
}

impl Drop for PixelGuard<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}
