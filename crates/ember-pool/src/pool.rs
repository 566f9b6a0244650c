//! Fixed-capacity slot pool with free-list allocation and deferred frees

use crate::handle::SlotKey;
use crate::lifecycle::{LifeState, Lifecycle, Transition};

struct Slot<T> {
    generation: u32,
    state: LifeState,
    /// Termination requested; the slot survives until the cleanup sweep
    waiting: bool,
    /// Activation granted: the object is live and externally driven
    on: bool,
    /// A terminated-but-visible object gets one display tick before the
    /// sweep reclaims it
    limbo_served: bool,
    body: T,
}

/// A read-only view of one allocated slot, for render iteration and tests
pub struct SlotView<'a, T> {
    pub key: SlotKey,
    pub state: LifeState,
    pub waiting: bool,
    pub on: bool,
    pub body: &'a T,
}

/// Fixed-capacity pool of lifecycle-managed objects.
///
/// Allocation pops a LIFO free list seeded so low indices surface first.
/// The bottom quarter of the free list is reserved headroom: ordinary
/// allocations fail once the pool runs that low, so priority effects can
/// still get a slot under load.
pub struct SlotPool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    reserve: usize,
}

impl<T: Default> SlotPool<T> {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        let mut free = Vec::with_capacity(capacity);
        for i in 0..capacity {
            slots.push(Slot {
                generation: 0,
                state: LifeState::Nothing,
                waiting: false,
                on: false,
                limbo_served: false,
                body: T::default(),
            });
            free.push((capacity - 1 - i) as u32);
        }
        Self {
            slots,
            free,
            reserve: capacity / 4,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn used_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn slot(&self, key: SlotKey) -> Option<&Slot<T>> {
        let slot = self.slots.get(key.index() as usize)?;
        if slot.generation != key.generation() || !slot.state.is_allocated() {
            return None;
        }
        Some(slot)
    }

    fn slot_mut(&mut self, key: SlotKey) -> Option<&mut Slot<T>> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() || !slot.state.is_allocated() {
            return None;
        }
        Some(slot)
    }

    pub fn contains(&self, key: SlotKey) -> bool {
        self.slot(key).is_some()
    }

    pub fn get(&self, key: SlotKey) -> Option<&T> {
        self.slot(key).map(|s| &s.body)
    }

    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        self.slot_mut(key).map(|s| &mut s.body)
    }

    pub fn state(&self, key: SlotKey) -> Option<LifeState> {
        self.slot(key).map(|s| s.state)
    }

    pub fn is_waiting(&self, key: SlotKey) -> bool {
        self.slot(key).map(|s| s.waiting).unwrap_or(false)
    }

    pub fn is_on(&self, key: SlotKey) -> bool {
        self.slot(key).map(|s| s.on).unwrap_or(false)
    }

    /// Keys of all allocated slots, in slot-index order
    pub fn keys(&self) -> Vec<SlotKey> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.state.is_allocated())
            .map(|(i, s)| SlotKey::new(i as u32, s.generation))
            .collect()
    }

    /// Iterate allocated slots in index order
    pub fn iter(&self) -> impl Iterator<Item = SlotView<'_, T>> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.state.is_allocated())
            .map(|(i, s)| SlotView {
                key: SlotKey::new(i as u32, s.generation),
                state: s.state,
                waiting: s.waiting,
                on: s.on,
                body: &s.body,
            })
    }

    /// Mark a slot for termination. Idempotent, safe on stale keys and
    /// mid-iteration: the actual free happens in `cleanup`.
    pub fn request_terminate(&mut self, key: SlotKey) -> bool {
        match self.slot_mut(key) {
            Some(slot) => {
                slot.waiting = true;
                true
            }
            None => false,
        }
    }
}

impl<T: Default> SlotPool<T> {
    /// Grab a free slot, or with `force` evict the least valuable live one.
    ///
    /// Eviction order: terminated slots awaiting cleanup first (least time
    /// left), then unprotected live slots (least time left). Protected
    /// objects are never evicted. Returns `None` on total exhaustion, which
    /// callers treat as "discard the spawn request", not as an error.
    pub fn allocate<C>(&mut self, force: bool, ctx: &mut C) -> Option<SlotKey>
    where
        T: Lifecycle<C>,
    {
        if self.free.is_empty() {
            if !force {
                return None;
            }
            let victim = self.find_victim()?;
            self.final_free(victim, ctx);
        } else if !force && self.free.len() <= self.reserve {
            // keep headroom for priority effects
            return None;
        }

        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        slot.state = LifeState::Constructing;
        slot.waiting = false;
        slot.on = false;
        slot.limbo_served = false;
        Some(SlotKey::new(index, slot.generation))
    }

    fn find_victim<C>(&self) -> Option<usize>
    where
        T: Lifecycle<C>,
    {
        let mut best_waiting: Option<(usize, u32)> = None;
        let mut best_live: Option<(usize, u32)> = None;

        for (i, slot) in self.slots.iter().enumerate() {
            if !slot.state.is_allocated() {
                continue;
            }
            let time = slot.body.time_left();
            if slot.waiting {
                if best_waiting.map(|(_, t)| time < t).unwrap_or(true) {
                    best_waiting = Some((i, time));
                }
            } else if !slot.body.protected()
                && best_live.map(|(_, t)| time < t).unwrap_or(true)
            {
                best_live = Some((i, time));
            }
        }

        best_waiting.or(best_live).map(|(i, _)| i)
    }

    /// Advance the state machine one state. `Processing` pumps are no-ops
    /// (the simulation drives live objects externally), and waiting slots
    /// hold for the cleanup sweep.
    pub fn run<C>(&mut self, key: SlotKey, ctx: &mut C) -> Option<LifeState>
    where
        T: Lifecycle<C>,
    {
        let index = key.index() as usize;
        {
            let slot = self.slot(key)?;
            if slot.waiting {
                return Some(slot.state);
            }
        }

        let slot = &mut self.slots[index];
        let outcome = match slot.state {
            LifeState::Nothing => return Some(LifeState::Nothing),
            LifeState::Constructing => slot.body.construct(ctx),
            LifeState::Initializing => slot.body.initialize(ctx),
            LifeState::Processing => Transition::Hold,
            LifeState::DeInitializing => slot.body.deinitialize(ctx),
            LifeState::Destructing => slot.body.destruct(ctx),
        };

        match outcome {
            Transition::Advance => {
                slot.state = match slot.state {
                    LifeState::Nothing => LifeState::Nothing,
                    LifeState::Constructing => LifeState::Initializing,
                    LifeState::Initializing => LifeState::Processing,
                    LifeState::Processing => LifeState::Processing,
                    LifeState::DeInitializing => LifeState::Destructing,
                    LifeState::Destructing => LifeState::Destructing,
                };
            }
            Transition::Hold => {}
            Transition::Terminate => slot.waiting = true,
        }
        Some(slot.state)
    }

    /// Drive a fresh slot through construction and initialization until it
    /// reaches `Processing`, bounded by `max_steps`. Grants activation on
    /// success; a handler that terminates leaves the slot for cleanup.
    pub fn activate<C>(&mut self, key: SlotKey, ctx: &mut C, max_steps: u32) -> bool
    where
        T: Lifecycle<C>,
    {
        for _ in 0..max_steps {
            match self.state(key) {
                None => return false,
                Some(LifeState::Processing) => {
                    if let Some(slot) = self.slot_mut(key) {
                        slot.on = true;
                    }
                    return true;
                }
                Some(_) => {
                    if self.is_waiting(key) {
                        return false;
                    }
                    self.run(key, ctx);
                }
            }
        }
        false
    }

    /// The once-per-tick sweep that performs every deferred free.
    ///
    /// A waiting slot that was visible gets exactly one sweep of grace so
    /// the renderer can draw its final frame; everything else waiting, and
    /// every slot that reached `Destructing`, is reclaimed now. Returns the
    /// number of slots freed.
    pub fn cleanup<C>(&mut self, ctx: &mut C) -> usize
    where
        T: Lifecycle<C>,
    {
        let mut freed = 0;
        for i in 0..self.slots.len() {
            let (state, waiting, on, limbo_served) = {
                let s = &self.slots[i];
                (s.state, s.waiting, s.on, s.limbo_served)
            };
            if !state.is_allocated() {
                continue;
            }

            if state == LifeState::Destructing {
                self.final_free(i, ctx);
                freed += 1;
            } else if waiting {
                if on && !limbo_served {
                    self.slots[i].limbo_served = true;
                    continue;
                }
                self.final_free(i, ctx);
                freed += 1;
            }
        }
        freed
    }

    /// Tear down slot `i` and return it to the free list
    fn final_free<C>(&mut self, i: usize, ctx: &mut C)
    where
        T: Lifecycle<C>,
    {
        let slot = &mut self.slots[i];
        let key = SlotKey::new(i as u32, slot.generation);

        slot.body.on_final_free(key, ctx);
        match slot.state {
            LifeState::Constructing | LifeState::Initializing | LifeState::Processing => {
                slot.body.deinitialize(ctx);
                slot.body.destruct(ctx);
            }
            LifeState::DeInitializing => {
                slot.body.destruct(ctx);
            }
            _ => {}
        }

        slot.state = LifeState::Nothing;
        slot.waiting = false;
        slot.on = false;
        slot.limbo_served = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(i as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Spark {
        ticks: u32,
        shielded: bool,
        death_spawns: u32,
        constructed: u32,
        destructed: u32,
    }

    struct Log {
        deaths: u32,
    }

    impl Lifecycle<Log> for Spark {
        fn construct(&mut self, _ctx: &mut Log) -> Transition {
            self.constructed += 1;
            Transition::Advance
        }
        fn initialize(&mut self, _ctx: &mut Log) -> Transition {
            if self.ticks == 0 {
                self.ticks = 10;
            }
            Transition::Advance
        }
        fn deinitialize(&mut self, _ctx: &mut Log) -> Transition {
            Transition::Advance
        }
        fn destruct(&mut self, _ctx: &mut Log) -> Transition {
            self.destructed += 1;
            Transition::Advance
        }
        fn on_final_free(&mut self, _key: SlotKey, ctx: &mut Log) {
            self.death_spawns += 1;
            ctx.deaths += 1;
        }
        fn time_left(&self) -> u32 {
            self.ticks
        }
        fn protected(&self) -> bool {
            self.shielded
        }
    }

    fn spawn(pool: &mut SlotPool<Spark>, ctx: &mut Log, force: bool) -> Option<SlotKey> {
        let key = pool.allocate(force, ctx)?;
        assert!(pool.activate(key, ctx, 100));
        Some(key)
    }

    #[test]
    fn allocate_activate_reaches_processing() {
        let mut pool: SlotPool<Spark> = SlotPool::new(8);
        let mut ctx = Log { deaths: 0 };
        let key = spawn(&mut pool, &mut ctx, true).unwrap();
        assert_eq!(pool.state(key), Some(LifeState::Processing));
        assert!(pool.is_on(key));
        assert_eq!(pool.used_count(), 1);
    }

    #[test]
    fn capacity_never_exceeded() {
        let mut pool: SlotPool<Spark> = SlotPool::new(8);
        let mut ctx = Log { deaths: 0 };
        for _ in 0..32 {
            spawn(&mut pool, &mut ctx, true);
            assert!(pool.used_count() <= pool.capacity());
        }
        assert_eq!(pool.used_count(), pool.capacity());
    }

    #[test]
    fn ordinary_allocation_keeps_headroom() {
        let mut pool: SlotPool<Spark> = SlotPool::new(8);
        let mut ctx = Log { deaths: 0 };
        // 8 slots, reserve 2: ordinary spawns stop at 6
        for i in 0..6 {
            assert!(spawn(&mut pool, &mut ctx, false).is_some(), "spawn {i}");
        }
        assert!(spawn(&mut pool, &mut ctx, false).is_none());
        assert!(spawn(&mut pool, &mut ctx, true).is_some());
    }

    #[test]
    fn terminate_is_idempotent_and_deferred() {
        let mut pool: SlotPool<Spark> = SlotPool::new(8);
        let mut ctx = Log { deaths: 0 };
        let key = spawn(&mut pool, &mut ctx, true).unwrap();

        assert!(pool.request_terminate(key));
        assert!(pool.request_terminate(key));
        // still allocated until a sweep decides otherwise
        assert!(pool.contains(key));
        assert_eq!(ctx.deaths, 0);

        // first sweep grants a limbo display tick, second reclaims
        pool.cleanup(&mut ctx);
        assert!(pool.contains(key));
        pool.cleanup(&mut ctx);
        assert!(!pool.contains(key));
        assert_eq!(ctx.deaths, 1);
    }

    #[test]
    fn never_activated_slot_frees_on_first_sweep() {
        let mut pool: SlotPool<Spark> = SlotPool::new(8);
        let mut ctx = Log { deaths: 0 };
        let key = pool.allocate(true, &mut ctx).unwrap();
        pool.request_terminate(key);
        pool.cleanup(&mut ctx);
        assert!(!pool.contains(key));
    }

    #[test]
    fn stale_key_misses_after_reuse() {
        let mut pool: SlotPool<Spark> = SlotPool::new(8);
        let mut ctx = Log { deaths: 0 };
        let key = spawn(&mut pool, &mut ctx, true).unwrap();
        pool.request_terminate(key);
        pool.cleanup(&mut ctx);
        pool.cleanup(&mut ctx);

        let reused = spawn(&mut pool, &mut ctx, true).unwrap();
        assert_eq!(reused.index(), key.index());
        assert_ne!(reused.generation(), key.generation());
        assert!(pool.get(key).is_none());
        assert!(pool.get(reused).is_some());
    }

    #[test]
    fn forced_eviction_prefers_waiting_then_short_lived() {
        let mut pool: SlotPool<Spark> = SlotPool::new(4);
        let mut ctx = Log { deaths: 0 };
        let keys: Vec<_> = (0..4)
            .map(|_| spawn(&mut pool, &mut ctx, true).unwrap())
            .collect();

        pool.get_mut(keys[0]).unwrap().ticks = 50;
        pool.get_mut(keys[1]).unwrap().ticks = 3;
        pool.get_mut(keys[2]).unwrap().ticks = 99;
        pool.get_mut(keys[3]).unwrap().ticks = 1;
        pool.request_terminate(keys[2]);

        // the terminated slot goes first despite the longest timer
        let a = spawn(&mut pool, &mut ctx, true).unwrap();
        assert_eq!(a.index(), keys[2].index());
        assert!(!pool.contains(keys[2]));

        // then the shortest-lived live slot
        pool.get_mut(a).unwrap().ticks = 50;
        let b = spawn(&mut pool, &mut ctx, true).unwrap();
        assert_eq!(b.index(), keys[3].index());
    }

    #[test]
    fn protected_slots_survive_forced_allocation() {
        let mut pool: SlotPool<Spark> = SlotPool::new(2);
        let mut ctx = Log { deaths: 0 };
        let a = spawn(&mut pool, &mut ctx, true).unwrap();
        let b = spawn(&mut pool, &mut ctx, true).unwrap();
        pool.get_mut(a).unwrap().shielded = true;
        pool.get_mut(b).unwrap().shielded = true;

        assert!(pool.allocate(true, &mut ctx).is_none());
        assert!(pool.contains(a) && pool.contains(b));
    }

    #[test]
    fn final_free_hook_fires_once_per_allocation() {
        let mut pool: SlotPool<Spark> = SlotPool::new(4);
        let mut ctx = Log { deaths: 0 };
        let key = spawn(&mut pool, &mut ctx, true).unwrap();
        pool.request_terminate(key);
        pool.cleanup(&mut ctx);
        pool.cleanup(&mut ctx);
        pool.cleanup(&mut ctx);
        assert_eq!(ctx.deaths, 1);
    }

    #[test]
    fn run_advances_one_state_per_call() {
        let mut pool: SlotPool<Spark> = SlotPool::new(4);
        let mut ctx = Log { deaths: 0 };
        let key = pool.allocate(true, &mut ctx).unwrap();
        assert_eq!(pool.state(key), Some(LifeState::Constructing));
        assert_eq!(pool.run(key, &mut ctx), Some(LifeState::Initializing));
        assert_eq!(pool.run(key, &mut ctx), Some(LifeState::Processing));
        // processing pumps hold
        assert_eq!(pool.run(key, &mut ctx), Some(LifeState::Processing));
    }

    #[test]
    fn iter_sees_allocated_slots_in_index_order() {
        let mut pool: SlotPool<Spark> = SlotPool::new(8);
        let mut ctx = Log { deaths: 0 };
        let keys: Vec<_> = (0..3)
            .map(|_| spawn(&mut pool, &mut ctx, true).unwrap())
            .collect();
        let seen: Vec<_> = pool.iter().map(|v| v.key).collect();
        assert_eq!(seen, keys);
    }
}
