use std::collections::BTreeMap;
use std::time::Duration;

use slotmap::{new_key_type, SlotMap};
use tracing::{trace, warn};

use super::{Clock, CyclicEasedValue, EasedValue};
use crate::frame_timer::FrameTimer;

new_key_type! {
    /// Handle to an [`EasedValue`] registered with a [`Ticker`].
    pub struct ValueKey;
    /// Handle to a [`CyclicEasedValue`] registered with a [`Ticker`].
    pub struct CyclicKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyValue {
    Eased(ValueKey),
    Cyclic(CyclicKey),
}

/// Dirty-list priority. Lower priorities are drained first within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Controller = 0,
    Workspace = 1,
    Window = 2,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Controller, Priority::Workspace, Priority::Window];
}

/// A value that moved during [`Ticker::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueChange<O> {
    pub value: AnyValue,
    pub owner: O,
    /// Whole turns a cyclic value wrapped by. Always zero for eased values.
    pub carry: i64,
}

#[derive(Debug)]
struct Entry<V, O> {
    id: u64,
    value: V,
    owner: O,
}

/// Frame scheduler for eased values and dirty nodes.
///
/// The ticker owns every value it animates. Values are advanced in registration order, which is
/// also the order their changes are reported in. Nodes that need recomputation wait in one of
/// three dirty lists. The frame timer runs exactly while there is something to advance or drain.
pub struct Ticker<O, N> {
    eased: SlotMap<ValueKey, Entry<EasedValue, O>>,
    cyclic: SlotMap<CyclicKey, Entry<CyclicEasedValue, O>>,
    active: BTreeMap<u64, AnyValue>,
    next_id: u64,
    dirty: [Vec<N>; 3],
    in_tick: bool,
    last_tick: Duration,
    interval: Duration,
    clock: Clock,
    timer: Box<dyn FrameTimer>,
    armed: bool,
}

impl<O: Copy, N: Copy + PartialEq> Ticker<O, N> {
    pub fn new(clock: Clock, frame_rate: u32, timer: Box<dyn FrameTimer>) -> Self {
        let frame_rate = frame_rate.max(1);
        Self {
            eased: SlotMap::with_key(),
            cyclic: SlotMap::with_key(),
            active: BTreeMap::new(),
            next_id: 0,
            dirty: [Vec::new(), Vec::new(), Vec::new()],
            in_tick: false,
            last_tick: clock.now(),
            interval: Duration::from_millis(u64::from(1000 / frame_rate)),
            clock,
            timer,
            armed: false,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn in_tick(&self) -> bool {
        self.in_tick
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.iter().map(Vec::len).sum()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, value: EasedValue, owner: O) -> ValueKey {
        let id = self.next_id();
        let paused = value.is_paused();
        let key = self.eased.insert(Entry { id, value, owner });
        if !paused {
            self.active.insert(id, AnyValue::Eased(key));
            self.sync_timer();
        }
        key
    }

    pub fn insert_cyclic(&mut self, value: CyclicEasedValue, owner: O) -> CyclicKey {
        let id = self.next_id();
        let paused = value.is_paused();
        let key = self.cyclic.insert(Entry { id, value, owner });
        if !paused {
            self.active.insert(id, AnyValue::Cyclic(key));
            self.sync_timer();
        }
        key
    }

    pub fn remove(&mut self, key: ValueKey) {
        if let Some(entry) = self.eased.remove(key) {
            self.active.remove(&entry.id);
            self.sync_timer();
        }
    }

    pub fn remove_cyclic(&mut self, key: CyclicKey) {
        if let Some(entry) = self.cyclic.remove(key) {
            self.active.remove(&entry.id);
            self.sync_timer();
        }
    }

    pub fn get(&self, key: ValueKey) -> Option<&EasedValue> {
        self.eased.get(key).map(|entry| &entry.value)
    }

    pub fn get_cyclic(&self, key: CyclicKey) -> Option<&CyclicEasedValue> {
        self.cyclic.get(key).map(|entry| &entry.value)
    }

    /// Current reading of a value, zero if it is gone.
    pub fn current(&self, key: ValueKey) -> f64 {
        self.get(key).map_or(0., EasedValue::current)
    }

    pub fn previous(&self, key: ValueKey) -> f64 {
        self.get(key).map_or(0., EasedValue::previous)
    }

    pub fn target(&self, key: ValueKey) -> f64 {
        self.get(key).map_or(0., EasedValue::target)
    }

    /// Mutates a value and starts or stops animating it as its pause state dictates.
    pub fn update<R>(&mut self, key: ValueKey, f: impl FnOnce(&mut EasedValue) -> R) -> Option<R> {
        let entry = self.eased.get_mut(key)?;
        let rv = f(&mut entry.value);
        let (id, paused) = (entry.id, entry.value.is_paused());
        self.set_active(id, AnyValue::Eased(key), !paused);
        Some(rv)
    }

    pub fn update_cyclic<R>(
        &mut self,
        key: CyclicKey,
        f: impl FnOnce(&mut CyclicEasedValue) -> R,
    ) -> Option<R> {
        let entry = self.cyclic.get_mut(key)?;
        let rv = f(&mut entry.value);
        let (id, paused) = (entry.id, entry.value.is_paused());
        self.set_active(id, AnyValue::Cyclic(key), !paused);
        Some(rv)
    }

    pub fn set_target(&mut self, key: ValueKey, target: f64) {
        self.update(key, |value| value.set_target(target));
    }

    pub fn jump_to(&mut self, key: ValueKey, value: f64) {
        self.update(key, |v| v.jump_to(value));
    }

    pub fn set_slope(&mut self, key: ValueKey, slope: f64) {
        self.update(key, |value| value.set_slope(slope));
    }

    fn set_active(&mut self, id: u64, value: AnyValue, active: bool) {
        let changed = if active {
            self.active.insert(id, value).is_none()
        } else {
            self.active.remove(&id).is_some()
        };
        if changed {
            self.sync_timer();
        }
    }

    /// Queues `node` for recomputation at `priority`.
    pub fn mark_dirty(&mut self, priority: Priority, node: N) {
        let list = &mut self.dirty[priority as usize];
        if !list.contains(&node) {
            list.push(node);
        }
        self.sync_timer();
    }

    /// Takes the dirty list of `priority` so that its nodes can be recomputed.
    pub fn take_dirty(&mut self, priority: Priority) -> Vec<N> {
        std::mem::take(&mut self.dirty[priority as usize])
    }

    /// Puts back the nodes that stayed dirty after recomputation.
    pub fn requeue_dirty(&mut self, priority: Priority, nodes: Vec<N>) {
        let list = &mut self.dirty[priority as usize];
        for node in nodes {
            if !list.contains(&node) {
                list.push(node);
            }
        }
        self.sync_timer();
    }

    /// Advances every active value to `now`, reporting the ones that moved.
    ///
    /// Opens a tick: timer changes are deferred until [`Ticker::finish_tick`].
    pub fn advance(&mut self, now: Duration) -> Vec<ValueChange<O>> {
        self.in_tick = true;

        let dt = now.saturating_sub(self.last_tick).as_secs_f64() * 1000.;
        if now < self.last_tick {
            warn!("clock went backwards: {now:?} < {:?}", self.last_tick);
        }
        self.last_tick = now;

        let mut changes = Vec::new();
        let mut settled = Vec::new();
        for (&id, &value) in &self.active {
            match value {
                AnyValue::Eased(key) => {
                    let Some(entry) = self.eased.get_mut(key) else {
                        settled.push(id);
                        continue;
                    };
                    if entry.value.advance(dt) {
                        changes.push(ValueChange {
                            value,
                            owner: entry.owner,
                            carry: 0,
                        });
                    }
                    if entry.value.is_paused() {
                        settled.push(id);
                    }
                }
                AnyValue::Cyclic(key) => {
                    let Some(entry) = self.cyclic.get_mut(key) else {
                        settled.push(id);
                        continue;
                    };
                    if entry.value.advance(dt) {
                        changes.push(ValueChange {
                            value,
                            owner: entry.owner,
                            carry: entry.value.carry(),
                        });
                    }
                    if entry.value.is_paused() {
                        settled.push(id);
                    }
                }
            }
        }

        for id in settled {
            self.active.remove(&id);
        }

        trace!(
            "advanced by {dt:.1} ms, {} changed, {} still active",
            changes.len(),
            self.active.len()
        );
        changes
    }

    /// Closes the tick opened by [`Ticker::advance`] and settles the frame timer.
    pub fn finish_tick(&mut self) {
        self.in_tick = false;
        self.sync_timer();
    }

    fn sync_timer(&mut self) {
        if self.in_tick {
            return;
        }

        let busy = !self.active.is_empty() || self.dirty_count() > 0;
        if busy && !self.armed {
            trace!("starting frame timer");
            self.last_tick = self.clock.now();
            self.armed = true;
            self.timer.arm(self.interval);
        } else if !busy && self.armed {
            trace!("stopping frame timer");
            self.armed = false;
            self.timer.disarm();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{ValueConfig, UNIT};
    use crate::frame_timer::ManualTimer;

    type TestTicker = Ticker<u32, u32>;

    fn ticker() -> (TestTicker, ManualTimer, Clock) {
        let clock = Clock::with_time(Duration::ZERO);
        let timer = ManualTimer::new();
        let ticker = Ticker::new(clock.clone(), 120, Box::new(timer.clone()));
        (ticker, timer, clock)
    }

    fn frame(ticker: &mut TestTicker, clock: &Clock) -> Vec<ValueChange<u32>> {
        clock.advance(ticker.interval());
        let changes = ticker.advance(clock.now());
        ticker.finish_tick();
        changes
    }

    #[test]
    fn interval_follows_frame_rate() {
        let (ticker, _, _) = ticker();
        assert_eq!(ticker.interval(), Duration::from_millis(8));
    }

    #[test]
    fn timer_runs_only_while_busy() {
        let (mut ticker, timer, clock) = ticker();
        let value = EasedValue::new(ValueConfig::new(1. / 32.).stick(90.)).unwrap();
        let key = ticker.insert(value, 7);
        assert!(!timer.is_armed());

        ticker.set_target(key, UNIT);
        assert!(timer.is_armed());
        assert_eq!(timer.arm_count(), 1);

        let mut frames = 0;
        while ticker.is_armed() {
            let changes = frame(&mut ticker, &clock);
            assert!(changes.iter().all(|change| change.owner == 7));
            frames += 1;
            assert!(frames < 1000);
        }
        assert!(!timer.is_armed());
        assert_eq!(ticker.current(key), UNIT);
        assert_eq!(ticker.active_count(), 0);
    }

    #[test]
    fn reports_changes_in_registration_order() {
        let (mut ticker, _, clock) = ticker();
        let config = ValueConfig::new(1. / 32.);
        let a = ticker.insert(EasedValue::new(config.clone()).unwrap(), 1);
        let b = ticker.insert(EasedValue::new(config).unwrap(), 2);
        ticker.set_target(b, UNIT);
        ticker.set_target(a, UNIT);

        let owners: Vec<_> = frame(&mut ticker, &clock)
            .into_iter()
            .map(|change| change.owner)
            .collect();
        assert_eq!(owners, [1, 2]);
    }

    #[test]
    fn dirty_nodes_keep_timer_alive() {
        let (mut ticker, timer, clock) = ticker();
        ticker.mark_dirty(Priority::Window, 3);
        ticker.mark_dirty(Priority::Window, 3);
        assert!(timer.is_armed());
        assert_eq!(ticker.dirty_count(), 1);

        ticker.advance(clock.now());
        let nodes = ticker.take_dirty(Priority::Window);
        assert_eq!(nodes, [3]);
        ticker.requeue_dirty(Priority::Window, Vec::new());
        assert!(timer.is_armed(), "timer must not change mid-tick");
        ticker.finish_tick();
        assert!(!timer.is_armed());
    }

    #[test]
    fn removed_values_stop_animating() {
        let (mut ticker, timer, _) = ticker();
        let key = ticker.insert(EasedValue::new(ValueConfig::new(0.1)).unwrap(), 0);
        ticker.set_target(key, 5.);
        assert!(timer.is_armed());
        ticker.remove(key);
        assert!(!timer.is_armed());
        assert!(ticker.get(key).is_none());
        assert_eq!(ticker.current(key), 0.);
    }

    #[test]
    fn cyclic_changes_carry() {
        let (mut ticker, _, clock) = ticker();
        let key = ticker.insert_cyclic(CyclicEasedValue::new(0.5, 0.).unwrap(), 9);
        ticker.update_cyclic(key, |value| value.add_delta(UNIT));
        let changes = frame(&mut ticker, &clock);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].carry, 1);
        assert_eq!(changes[0].value, AnyValue::Cyclic(key));
    }
}
