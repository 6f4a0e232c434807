/// Millisecond time source used to bound driver operations.
///
/// The counter is free running and may wrap; only differences between two readings
/// are used.
pub trait Clock {
    /// Current time in milliseconds
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Time budget shared by every step of one driver operation.
///
/// Created once when the operation starts and passed by reference to each sub-step,
/// so the budget is never re-armed: every check measures from the same start instant.
pub struct Timeout<'a, C: Clock> {
    clock: &'a C,
    start: u32,
    budget_ms: u32,
}

impl<'a, C: Clock> Timeout<'a, C> {
    /// Start a budget of `budget_ms` milliseconds from now.
    pub fn new(clock: &'a C, budget_ms: u32) -> Self {
        Timeout {
            clock,
            start: clock.now_ms(),
            budget_ms,
        }
    }

    /// Milliseconds since the budget was started
    pub fn elapsed(&self) -> u32 {
        self.clock.now_ms().wrapping_sub(self.start)
    }

    /// Milliseconds left, 0 once expired
    pub fn remaining(&self) -> u32 {
        self.budget_ms.saturating_sub(self.elapsed())
    }

    /// Whether the budget is used up. A zero budget is always expired.
    pub fn expired(&self) -> bool {
        self.elapsed() >= self.budget_ms
    }

    pub fn budget(&self) -> u32 {
        self.budget_ms
    }
}

impl<C: Clock> core::fmt::Debug for Timeout<'_, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Timeout")
            .field("start", &self.start)
            .field("budget_ms", &self.budget_ms)
            .finish()
    }
}
