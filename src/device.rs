//! Program device seam.
//!
//! The cache never talks to a graphics API directly. A [`ProgramDevice`]
//! turns validated bytecode into a [`NativeProgram`], an owned handle that
//! releases the underlying object when dropped.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::descriptor::ShaderClass;
use crate::errors::{KilnError, Result};

/// An owned native program object.
pub trait NativeProgram: Send + Sync + 'static {
    /// Short human readable description for logs.
    fn label(&self) -> String;

    fn as_any(&self) -> &dyn Any;
}

/// Creates native programs from bytecode. Called from worker threads.
pub trait ProgramDevice: Send + Sync + 'static {
    fn create_program(&self, class: ShaderClass, bytecode: &[u8]) -> Result<Box<dyn NativeProgram>>;
}

// ============================================================================
// Headless device
// ============================================================================

/// A device without a GPU: programs keep their bytecode in memory.
///
/// Used by tools that only need to validate or warm the disk cache, and by
/// tests. Tracks how many programs are alive so leaks and double releases are
/// observable.
#[derive(Default)]
pub struct HeadlessDevice {
    live: Arc<AtomicUsize>,
    created: AtomicUsize,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs created and not yet dropped.
    #[must_use]
    pub fn live_programs(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Programs created over the device's lifetime.
    #[must_use]
    pub fn created_programs(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }
}

impl ProgramDevice for HeadlessDevice {
    fn create_program(&self, class: ShaderClass, bytecode: &[u8]) -> Result<Box<dyn NativeProgram>> {
        if bytecode.is_empty() {
            return Err(KilnError::ProgramCreation {
                class: class.to_string(),
                reason: "empty bytecode".to_string(),
            });
        }

        self.live.fetch_add(1, Ordering::AcqRel);
        self.created.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(HeadlessProgram {
            class,
            bytecode: bytecode.to_vec(),
            live: Arc::clone(&self.live),
        }))
    }
}

impl<D: ProgramDevice> ProgramDevice for Arc<D> {
    fn create_program(&self, class: ShaderClass, bytecode: &[u8]) -> Result<Box<dyn NativeProgram>> {
        self.as_ref().create_program(class, bytecode)
    }
}

/// Program created by [`HeadlessDevice`].
pub struct HeadlessProgram {
    pub class: ShaderClass,
    pub bytecode: Vec<u8>,
    live: Arc<AtomicUsize>,
}

impl NativeProgram for HeadlessProgram {
    fn label(&self) -> String {
        format!("headless {} program ({} bytes)", self.class, self.bytecode.len())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for HeadlessProgram {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for HeadlessProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programs_are_released_once() {
        let device = HeadlessDevice::new();
        let a = device.create_program(ShaderClass::Vertex, b"abc").unwrap();
        let b = device.create_program(ShaderClass::Pixel, b"def").unwrap();
        assert_eq!(device.live_programs(), 2);

        drop(a);
        assert_eq!(device.live_programs(), 1);
        drop(b);
        assert_eq!(device.live_programs(), 0);
        assert_eq!(device.created_programs(), 2);
    }

    #[test]
    fn empty_bytecode_is_rejected() {
        let device = HeadlessDevice::new();
        let err = device.create_program(ShaderClass::Compute, &[]).err().unwrap();
        assert!(matches!(err, KilnError::ProgramCreation { .. }));
        assert!(err.is_permanent());
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn downcast_to_headless() {
        let device = HeadlessDevice::new();
        let program = device.create_program(ShaderClass::Pixel, b"xyz").unwrap();
        let headless = program.as_any().downcast_ref::<HeadlessProgram>().unwrap();
        assert_eq!(headless.bytecode, b"xyz");
    }
}
