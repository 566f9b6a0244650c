//! Ember Pool - Generic object lifecycle machine over a fixed slot array
//!
//! Pooled engine objects (particles here; the same shape fits enchants and
//! model instances) share one lifecycle: a slot is allocated, constructed,
//! initialized, then sits in `Processing` while the simulation drives it,
//! and is finally de-initialized and destructed back onto the free list.
//! Termination is two-phase: `request_terminate` only marks the slot, and a
//! single `cleanup` sweep per tick performs the actual frees, so iteration
//! over the pool is never invalidated mid-tick.

mod handle;
mod lifecycle;
mod pool;

pub use handle::SlotKey;
pub use lifecycle::{LifeState, Lifecycle, Transition};
pub use pool::{SlotPool, SlotView};
