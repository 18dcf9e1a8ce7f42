//! Hart unit tests.


/// Load-reserved/store-conditional and fetch-and-op atomics.
pub mod atomics;


/// Virtual memory through the executing hart.
pub mod translation;

/// Trap entry, delegation, and trap return.
pub mod traps;

/// Floating-point instructions end to end.
pub mod fp;
