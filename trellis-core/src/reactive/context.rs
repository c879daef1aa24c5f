//! Reactive Context
//!
//! The reactive context tracks which effect is currently running. This
//! enables automatic dependency tracking: when a reactive field is read, the
//! effect on top of the stack is registered as a subscriber.
//!
//! # Implementation
//!
//! Each `Runtime` owns one stack. When an effect runs, it is pushed onto the
//! stack; when its body returns, a guard pops it and restores the previous
//! top as the active effect. Nested effects (a component mounting a child
//! component inside its own render effect) are attributed correctly.
//!
//! Unlike a thread-local stack, the context lives inside the runtime, so two
//! runtimes in the same test never observe each other's effects.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::effect::EffectInner;
use super::subscriber::EffectId;

pub(crate) struct ReactiveContext {
    stack: RefCell<Vec<Rc<EffectInner>>>,
    should_track: Cell<bool>,
}

impl ReactiveContext {
    pub(crate) fn new() -> Self {
        Self {
            stack: RefCell::new(Vec::new()),
            should_track: Cell::new(true),
        }
    }

    /// Push `effect` as the active computation.
    ///
    /// Tracking is re-enabled for the duration of the run even if the caller
    /// paused it; the guard restores the previous state.
    pub(crate) fn enter(&self, effect: Rc<EffectInner>) -> ContextGuard<'_> {
        let id = effect.id();
        self.stack.borrow_mut().push(effect);
        let prev_should_track = self.should_track.replace(true);
        ContextGuard {
            context: self,
            id,
            prev_should_track,
        }
    }

    /// Pause tracking until the returned guard is dropped.
    pub(crate) fn pause(&self) -> PauseGuard<'_> {
        let prev = self.should_track.replace(false);
        PauseGuard {
            context: self,
            prev,
        }
    }

    pub(crate) fn current(&self) -> Option<Rc<EffectInner>> {
        self.stack.borrow().last().cloned()
    }

    pub(crate) fn is_tracking(&self) -> bool {
        self.should_track.get() && !self.stack.borrow().is_empty()
    }

    pub(crate) fn contains(&self, id: EffectId) -> bool {
        self.stack.borrow().iter().any(|effect| effect.id() == id)
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

/// Pops the active effect when dropped, even if the body panicked.
pub(crate) struct ContextGuard<'a> {
    context: &'a ReactiveContext,
    id: EffectId,
    prev_should_track: bool,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.context.stack.borrow_mut().pop();
        if let Some(effect) = popped {
            debug_assert_eq!(
                effect.id(),
                self.id,
                "ReactiveContext mismatch: expected {}, got {}",
                self.id,
                effect.id()
            );
        }
        self.context.should_track.set(self.prev_should_track);
    }
}

pub(crate) struct PauseGuard<'a> {
    context: &'a ReactiveContext,
    prev: bool,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.context.should_track.set(self.prev);
    }
}

#[cfg(test)]
mod tests {
    use crate::reactive::{Effect, Runtime};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn context_tracks_active_effect() {
        let rt = Runtime::new();
        assert!(!rt.is_tracking());

        let seen_depth = Rc::new(Cell::new(0));
        let seen = seen_depth.clone();
        let inner_rt = rt.clone();
        let _effect = Effect::new(&rt, move || {
            assert!(inner_rt.is_tracking());
            seen.set(inner_rt.context().depth());
        });

        assert_eq!(seen_depth.get(), 1);
        assert!(!rt.is_tracking());
        assert_eq!(rt.context().depth(), 0);
    }

    #[test]
    fn nested_contexts_restore_outer() {
        let rt = Runtime::new();
        let outer_after_inner = Rc::new(Cell::new(None));

        let record = outer_after_inner.clone();
        let outer_rt = rt.clone();
        let _outer = Effect::new(&rt, move || {
            let outer_id = outer_rt.context().current().map(|e| e.id());
            let inner_rt = outer_rt.clone();
            let inner = Effect::new(&outer_rt, move || {
                assert_eq!(inner_rt.context().depth(), 2);
            });
            drop(inner);
            let after = outer_rt.context().current().map(|e| e.id());
            record.set(Some(after == outer_id));
        });

        assert_eq!(outer_after_inner.get(), Some(true));
    }

    #[test]
    fn pause_disables_tracking_inside_effect() {
        let rt = Runtime::new();
        let paused = Rc::new(Cell::new(true));

        let flag = paused.clone();
        let inner_rt = rt.clone();
        let _effect = Effect::new(&rt, move || {
            inner_rt.untrack(|| flag.set(inner_rt.is_tracking()));
        });

        assert!(!paused.get());
    }
}
