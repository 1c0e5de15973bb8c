//! `dvrp-engine` — scheduling primitives for the `rust_dvrp` framework.
//!
//! # Why this exists
//!
//! The simulation runs on a single cooperative thread: actor state machines
//! advance to their next suspension point and record how they want to be
//! woken.  This crate owns the three wake mechanisms, generic over the wake
//! payload so the sim layer can schedule whatever actor handle it likes:
//!
//! | Type         | Wakes a waiter when…                                  |
//! |--------------|-------------------------------------------------------|
//! | [`EventQueue`] | the simulated clock reaches the scheduled instant   |
//! | [`Signal`]     | someone triggers the one-shot event                 |
//! | [`Resource`]   | a counted FIFO slot is granted or handed off        |
//!
//! Ordering is strict `(time, seq)`: two entries at the same instant pop in
//! the order they were pushed.  Timers can be canceled; cancellation is lazy
//! (dead entries are skipped on pop), which keeps `cancel` O(1) while `pop`
//! stays O(log n) amortized.

pub mod queue;
pub mod resource;
pub mod signal;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use queue::{EventQueue, TimerId};
pub use resource::{Acquire, Resource};
pub use signal::{Signal, Wait};
