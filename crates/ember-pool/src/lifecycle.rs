//! Lifecycle states and the per-kind state machine trait

use crate::handle::SlotKey;

/// The lifecycle states of a pooled object, in pump order.
///
/// The only legal forward move is to the next state. Early termination
/// jumps to `DeInitializing`/`Destructing` via the waiting flag, and forced
/// slot reuse re-enters `Constructing`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LifeState {
    #[default]
    Nothing,
    Constructing,
    Initializing,
    Processing,
    DeInitializing,
    Destructing,
}

impl LifeState {
    /// Whether the slot counts as allocated
    pub fn is_allocated(&self) -> bool {
        !matches!(self, LifeState::Nothing)
    }

    /// Whether the object is in its live, externally-driven state
    pub fn is_processing(&self) -> bool {
        matches!(self, LifeState::Processing)
    }
}

/// What a state handler wants the machine to do next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Move on to the next state
    Advance,
    /// Stay in the current state for another pump
    Hold,
    /// Abort: mark the object waiting for the cleanup sweep
    Terminate,
}

/// The per-kind half of the state machine.
///
/// `SlotPool::run` calls exactly one handler per pump; handlers are plain
/// functions of the object plus an external context (template registry,
/// terrain, RNG, outgoing queues) supplied by the caller. Handlers must not
/// touch the pool itself: anything that would allocate or free goes through
/// the context as a queued request.
pub trait Lifecycle<Ctx> {
    /// Reset internal storage for a freshly (re)allocated slot
    fn construct(&mut self, ctx: &mut Ctx) -> Transition;

    /// Apply spawn-time parameters. May return `Transition::Terminate`
    /// (e.g. a required target could not be resolved).
    fn initialize(&mut self, ctx: &mut Ctx) -> Transition;

    /// Release references before the slot is reclaimed
    fn deinitialize(&mut self, ctx: &mut Ctx) -> Transition;

    /// Final teardown
    fn destruct(&mut self, ctx: &mut Ctx) -> Transition;

    /// Called exactly once per allocation, just before the slot is freed
    /// (death spawns, end sounds). Guarded by the pool, not the object;
    /// `key` is the dying slot's own handle, still valid during the call.
    fn on_final_free(&mut self, key: SlotKey, ctx: &mut Ctx);

    /// Ticks until the object would expire on its own; eviction prefers
    /// the smallest value
    fn time_left(&self) -> u32;

    /// Protected objects are never evicted by forced allocation
    fn protected(&self) -> bool;
}
