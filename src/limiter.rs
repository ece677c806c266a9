use std::sync::atomic::{AtomicUsize, Ordering};

// ---------------------------------------------------------------------------
// Limiter
// ---------------------------------------------------------------------------

/// A capacity-bounded, non-blocking token pool.
///
/// The walk thread dispatches every unit of work through this pool. A
/// *blocking* acquire could deadlock — the walking thread is itself a
/// potential worker and must never wait on workers it gates. Instead,
/// [`try_acquire`](Limiter::try_acquire) either hands out a [`Token`]
/// immediately or returns `None`, and the dispatcher runs the work inline on
/// its own thread. Forward progress is guaranteed; the effective worker count
/// may briefly exceed capacity by the calling thread itself.
pub(crate) struct Limiter {
    held: AtomicUsize,
    capacity: usize,
}

impl Limiter {
    /// Create a pool with a fixed number of slots. Capacity must be >= 1;
    /// the builder validates this before the engine runs.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            held: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Take a slot without blocking. `None` means the pool is saturated.
    pub(crate) fn try_acquire(&self) -> Option<Token<'_>> {
        let mut held = self.held.load(Ordering::Relaxed);
        loop {
            if held >= self.capacity {
                return None;
            }
            match self
                .held
                .compare_exchange(held, held + 1, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Some(Token { pool: self }),
                Err(current) => held = current,
            }
        }
    }

    fn release(&self) {
        self.held.fetch_sub(1, Ordering::Release);
    }
}

/// An opaque lease on one pool slot.
///
/// Held for the duration of one dispatched unit of work; the slot returns to
/// the pool on drop, whether the work succeeded or failed.
pub(crate) struct Token<'a> {
    pool: &'a Limiter,
}

impl Drop for Token<'_> {
    fn drop(&mut self) {
        self.pool.release();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_up_to_capacity() {
        let pool = Limiter::new(2);
        let a = pool.try_acquire();
        let b = pool.try_acquire();
        assert!(a.is_some());
        assert!(b.is_some());
        assert!(pool.try_acquire().is_none(), "third slot must be refused");
    }

    #[test]
    fn drop_returns_slot() {
        let pool = Limiter::new(1);
        let token = pool.try_acquire().unwrap();
        assert!(pool.try_acquire().is_none());
        drop(token);
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn capacity_never_exceeded_under_contention() {
        use std::sync::Arc;

        let pool = Arc::new(Limiter::new(3));
        let peak = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let pool = Arc::clone(&pool);
                let peak = Arc::clone(&peak);
                scope.spawn(move || {
                    for _ in 0..1000 {
                        if let Some(_token) = pool.try_acquire() {
                            let now = pool.held.load(Ordering::Relaxed);
                            peak.fetch_max(now, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert!(peak.load(Ordering::Relaxed) <= 3);
    }
}
