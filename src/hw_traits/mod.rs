//! Register-level traits. The bus driver and the DMA strategy only touch hardware through these,
//! so any register block that implements them can be driven, including test doubles.

pub mod dma;
pub mod eusci;

/// Zero-sized peripheral handles that can be conjured without an owned value.
pub trait Steal {
    /// Create an instance of a peripheral handle.
    ///
    /// # Safety
    ///
    /// Only call this when the handle is already owned elsewhere in a way the compiler can't see.
    unsafe fn steal() -> Self;
}
