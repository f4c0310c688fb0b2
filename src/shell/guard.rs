//! Resource limits for running scripts
//!
//! The [`Guard`] counts loop back-edges against an optional branch limit and
//! derives the native stack limit from the stack base captured in `main`.

use super::constants::BRANCH_GC_MASK;
use crate::interpreter::constants::STACK_GROWS_DOWN;

/// Outcome of counting one back-edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTick {
    Continue,
    /// Time for an opportunistic collection.
    Collect,
    /// The branch limit was reached; the counter has been reset.
    LimitReached,
}

#[derive(Debug, Clone)]
pub struct Guard {
    branch_count: u32,
    /// 0 disables the limit.
    branch_limit: u32,
    stack_base: usize,
    /// 0 disables the stack check.
    max_stack_size: usize,
}

impl Guard {
    pub fn new(stack_base: usize) -> Self {
        Guard {
            branch_count: 0,
            branch_limit: 0,
            stack_base,
            max_stack_size: 0,
        }
    }

    pub fn branch_count(&self) -> u32 {
        self.branch_count
    }

    pub fn branch_limit(&self) -> u32 {
        self.branch_limit
    }

    pub fn set_branch_limit(&mut self, limit: u32) {
        self.branch_limit = limit;
    }

    pub fn max_stack_size(&self) -> usize {
        self.max_stack_size
    }

    pub fn set_max_stack_size(&mut self, size: usize) {
        self.max_stack_size = size;
    }

    /// Counts one back-edge.
    pub fn tick(&mut self) -> BranchTick {
        self.branch_count = self.branch_count.wrapping_add(1);
        if self.branch_limit != 0 && self.branch_count >= self.branch_limit {
            self.branch_count = 0;
            return BranchTick::LimitReached;
        }
        if self.branch_count & BRANCH_GC_MASK == BRANCH_GC_MASK {
            BranchTick::Collect
        } else {
            BranchTick::Continue
        }
    }

    /// The address a call must not pass, given the current settings.
    pub fn stack_limit(&self) -> Option<usize> {
        compute_stack_limit(self.stack_base, self.max_stack_size)
    }
}

/// `None` when `max_stack_size` is 0, otherwise the address that lies
/// `max_stack_size` bytes past `base` in the direction of stack growth.
pub fn compute_stack_limit(base: usize, max_stack_size: usize) -> Option<usize> {
    if max_stack_size == 0 {
        return None;
    }
    if STACK_GROWS_DOWN {
        Some(base.saturating_sub(max_stack_size))
    } else {
        Some(base.saturating_add(max_stack_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_resets_counter() {
        let mut guard = Guard::new(0);
        guard.set_branch_limit(3);
        assert_eq!(guard.tick(), BranchTick::Continue);
        assert_eq!(guard.tick(), BranchTick::Continue);
        assert_eq!(guard.tick(), BranchTick::LimitReached);
        assert_eq!(guard.branch_count(), 0);
        assert_eq!(guard.tick(), BranchTick::Continue);
        assert_eq!(guard.branch_count(), 1);
    }

    #[test]
    fn test_collect_every_mask_boundary() {
        let mut guard = Guard::new(0);
        let collects = (0..(BRANCH_GC_MASK + 1) * 2)
            .filter(|_| guard.tick() == BranchTick::Collect)
            .count();
        assert_eq!(collects, 2);
    }

    #[test]
    fn test_unlimited_never_aborts() {
        let mut guard = Guard::new(0);
        assert!((0..100_000).all(|_| guard.tick() != BranchTick::LimitReached));
    }

    #[test]
    fn test_compute_stack_limit() {
        assert_eq!(compute_stack_limit(0x10000, 0), None);
        assert_eq!(compute_stack_limit(0x10000, 0x1000), Some(0xf000));
        assert_eq!(compute_stack_limit(0x10, 0x1000), Some(0));
    }
}
