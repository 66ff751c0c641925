//! Hierarchical event-composition runtime.
//!
//! A session is a tree of units sharing one mutable context and one event
//! channel. Units are mounted into a [`Node`] tree before activation; the
//! tree is consumed by [`Runtime::activate`], so late mounting is impossible
//! by construction. Dispatch is synchronous and stack-based: events emitted
//! from inside a handler run through the whole tree before the outer event
//! reaches the next unit.

use std::time::Duration;

/// Dispatch depth past which cascading emissions are dropped instead of
/// recursing further.
const MAX_DISPATCH_DEPTH: usize = 64;

/// Handle for a scheduled deferred event, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Side-effect handle passed to every middleware hook. Emissions and timer
/// operations are collected here and applied by the runtime after the hook
/// returns.
pub struct Effects<E> {
    emitted: Vec<E>,
    scheduled: Vec<(TimerId, Duration, E)>,
    cancelled: Vec<TimerId>,
    next_timer_id: u64,
}

impl<E> Effects<E> {
    fn new(next_timer_id: u64) -> Self {
        Self {
            emitted: Vec::new(),
            scheduled: Vec::new(),
            cancelled: Vec::new(),
            next_timer_id,
        }
    }

    /// Emit an event. It is dispatched depth-first, after the current hook
    /// returns and before any later unit sees the event being handled now.
    pub fn emit(&mut self, event: E) {
        self.emitted.push(event);
    }

    /// Schedule `event` to be emitted after `delay` of runtime time.
    pub fn schedule(&mut self, delay: Duration, event: E) -> TimerId {
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        self.scheduled.push((id, delay, event));
        id
    }

    /// Cancel a previously scheduled event. Cancelling an already-fired or
    /// unknown timer is a no-op.
    pub fn cancel(&mut self, id: TimerId) {
        self.cancelled.push(id);
    }
}

/// A unit of game logic. Hooks default to no-ops so units implement only
/// what they listen for.
pub trait Middleware<C, E>: Send {
    fn activate(&mut self, _context: &mut C, _fx: &mut Effects<E>) {}
    fn deactivate(&mut self, _context: &mut C, _fx: &mut Effects<E>) {}
    fn on_event(&mut self, _context: &mut C, _event: &E, _fx: &mut Effects<E>) {}
}

/// A unit plus its mounted children. Children are mounted before activation;
/// activation visits the parent first, then children, depth-first.
pub struct Node<C, E> {
    unit: Box<dyn Middleware<C, E>>,
    children: Vec<Node<C, E>>,
}

impl<C, E> Node<C, E> {
    pub fn new(unit: impl Middleware<C, E> + 'static) -> Self {
        Self {
            unit: Box::new(unit),
            children: Vec::new(),
        }
    }

    /// Mount a child unit under this node.
    pub fn mount(mut self, child: Node<C, E>) -> Self {
        self.children.push(child);
        self
    }

    fn flatten(self, out: &mut Vec<Option<Box<dyn Middleware<C, E>>>>) {
        out.push(Some(self.unit));
        for child in self.children {
            child.flatten(out);
        }
    }
}

struct Timer<E> {
    id: TimerId,
    remaining: Duration,
    event: E,
}

/// An activated session: the shared context, the flattened unit tree, and
/// the pending timers.
pub struct Runtime<C, E> {
    context: C,
    units: Vec<Option<Box<dyn Middleware<C, E>>>>,
    timers: Vec<Timer<E>>,
    next_timer_id: u64,
    active: bool,
    depth: usize,
}

impl<C, E> Runtime<C, E> {
    /// Build the session from a unit tree and a context seed, then run every
    /// unit's activation hook in mount order (parent before children).
    pub fn activate(root: Node<C, E>, context: C) -> Self {
        let mut units = Vec::new();
        root.flatten(&mut units);
        let mut runtime = Self {
            context,
            units,
            timers: Vec::new(),
            next_timer_id: 0,
            active: true,
            depth: 0,
        };
        for index in 0..runtime.units.len() {
            let Some(mut unit) = runtime.units[index].take() else {
                continue;
            };
            let mut fx = Effects::new(runtime.next_timer_id);
            unit.activate(&mut runtime.context, &mut fx);
            runtime.units[index] = Some(unit);
            runtime.apply(fx);
        }
        runtime
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Dispatch an event to every unit in mount order. Handlers run to
    /// completion before this returns; emitting on a deactivated runtime or
    /// with no listeners is a no-op.
    pub fn emit(&mut self, event: E) {
        if !self.active {
            return;
        }
        if self.depth >= MAX_DISPATCH_DEPTH {
            tracing::warn!("event dispatch depth limit reached, dropping event");
            return;
        }
        self.depth += 1;
        for index in 0..self.units.len() {
            // The slot is empty only while this same unit is being invoked
            // higher up the dispatch stack.
            let Some(mut unit) = self.units[index].take() else {
                continue;
            };
            let mut fx = Effects::new(self.next_timer_id);
            unit.on_event(&mut self.context, &event, &mut fx);
            self.units[index] = Some(unit);
            self.apply(fx);
            if !self.active {
                break;
            }
        }
        self.depth -= 1;
    }

    /// Advance runtime time, emitting every timer that comes due. Due timers
    /// fire in the order they were scheduled.
    pub fn advance_timers(&mut self, dt: Duration) {
        if !self.active {
            return;
        }
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.timers.len() {
            let timer = &mut self.timers[index];
            if timer.remaining <= dt {
                due.push(self.timers.remove(index));
            } else {
                timer.remaining -= dt;
                index += 1;
            }
        }
        for timer in due {
            self.emit(timer.event);
        }
    }

    /// Run deactivation hooks in reverse activation order, cancel all timers,
    /// and make every further `emit` a no-op.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.timers.clear();
        for index in (0..self.units.len()).rev() {
            let Some(mut unit) = self.units[index].take() else {
                continue;
            };
            let mut fx = Effects::new(self.next_timer_id);
            unit.deactivate(&mut self.context, &mut fx);
            self.units[index] = Some(unit);
            // Deactivation hooks may not re-emit; scheduled work dies here.
        }
        self.active = false;
    }

    fn apply(&mut self, fx: Effects<E>) {
        self.next_timer_id = fx.next_timer_id;
        for id in fx.cancelled {
            self.timers.retain(|timer| timer.id != id);
        }
        for (id, delay, event) in fx.scheduled {
            self.timers.push(Timer {
                id,
                remaining: delay,
                event,
            });
        }
        // Depth-first: drain this hook's emissions before the outer event
        // continues to the next unit.
        for event in fx.emitted {
            self.emit(event);
        }
    }
}
