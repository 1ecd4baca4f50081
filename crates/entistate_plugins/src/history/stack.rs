//! Undo/redo stack.

/// Default number of past snapshots kept.
pub const DEFAULT_MAX_AGE: usize = 10;

/// Past, present and future snapshots of one value.
///
/// `past` is ordered oldest first; `future` is ordered next-redo first.
#[derive(Debug, Clone, PartialEq)]
pub struct StateHistory<T> {
    past: Vec<T>,
    present: T,
    future: Vec<T>,
    max_age: usize,
    skip_next: bool,
}

impl<T: Clone> StateHistory<T> {
    /// Creates a history whose present is `present`.
    pub fn new(present: T, max_age: usize) -> Self {
        Self {
            past: Vec::new(),
            present,
            future: Vec::new(),
            max_age,
            skip_next: false,
        }
    }

    /// Records `snapshot` as the new present.
    ///
    /// The old present moves to the end of `past` (dropping the oldest
    /// entry beyond `max_age`) and `future` is cleared. Returns false when
    /// the push was suppressed by [`StateHistory::ignore_next`].
    pub fn push(&mut self, snapshot: T) -> bool {
        if self.skip_next {
            self.skip_next = false;
            return false;
        }
        let previous = std::mem::replace(&mut self.present, snapshot);
        self.past.push(previous);
        self.trim();
        self.future.clear();
        true
    }

    /// Replaces the present without recording the old one.
    pub fn set_present(&mut self, snapshot: T) {
        self.present = snapshot;
    }

    /// Steps back one snapshot. Returns false when there is no past.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.insert(0, current);
        true
    }

    /// Steps forward one snapshot. Returns false when there is no future.
    pub fn redo(&mut self) -> bool {
        if self.future.is_empty() {
            return false;
        }
        let next = self.future.remove(0);
        let current = std::mem::replace(&mut self.present, next);
        self.past.push(current);
        self.trim();
        true
    }

    /// Makes `past[index]` the present. Out-of-range indices are ignored.
    pub fn jump_to_past(&mut self, index: usize) -> bool {
        if index >= self.past.len() {
            return false;
        }
        let mut skipped = self.past.split_off(index);
        let target = skipped.remove(0);
        let current = std::mem::replace(&mut self.present, target);
        skipped.push(current);
        skipped.append(&mut self.future);
        self.future = skipped;
        true
    }

    /// Makes `future[index]` the present. Out-of-range indices are ignored.
    pub fn jump_to_future(&mut self, index: usize) -> bool {
        if index >= self.future.len() {
            return false;
        }
        let rest = self.future.split_off(index + 1);
        let mut passed = std::mem::replace(&mut self.future, rest);
        let target = passed.pop();
        let Some(target) = target else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, target);
        self.past.push(current);
        self.past.append(&mut passed);
        self.trim();
        true
    }

    /// Moves `steps` snapshots forward (positive) or back (negative).
    pub fn jump(&mut self, steps: isize) -> bool {
        match steps {
            0 => false,
            n if n > 0 => self.jump_to_future(n.unsigned_abs() - 1),
            n => match self.past.len().checked_sub(n.unsigned_abs()) {
                Some(index) => self.jump_to_past(index),
                None => false,
            },
        }
    }

    /// Drops past and future, keeping the present.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// Suppresses the next push.
    pub fn ignore_next(&mut self) {
        self.skip_next = true;
    }

    /// Returns true if a push is currently suppressed.
    pub fn is_ignoring_next(&self) -> bool {
        self.skip_next
    }

    /// Returns true if `undo` would change the present.
    pub fn has_past(&self) -> bool {
        !self.past.is_empty()
    }

    /// Returns true if `redo` would change the present.
    pub fn has_future(&self) -> bool {
        !self.future.is_empty()
    }

    /// Returns the current snapshot.
    pub fn present(&self) -> &T {
        &self.present
    }

    /// Returns past snapshots, oldest first.
    pub fn past(&self) -> &[T] {
        &self.past
    }

    /// Returns future snapshots, next first.
    pub fn future(&self) -> &[T] {
        &self.future
    }

    /// Returns the past capacity.
    pub fn max_age(&self) -> usize {
        self.max_age
    }

    fn trim(&mut self) {
        if self.past.len() > self.max_age {
            let excess = self.past.len() - self.max_age;
            self.past.drain(..excess);
        }
    }
}
