//! Deterministic fault injection shared by both simulated devices.

/// Controls whether a simulated device's next calls should pretend to fail.
///
/// This is the single mechanism the test suite uses to exercise every
/// `Degraded`/`Failed` transition in `volman`'s state machine: rather than
/// racing a real device into actually failing, tests arm a `FaultInjector`
/// and get a deterministic short transfer on demand.
#[derive(Debug, Default, Clone, Copy)]
pub struct FaultInjector {
    hard_fail: bool,
    fail_after: Option<u32>,
}

impl FaultInjector {
    /// A device that never fails.
    #[must_use]
    pub const fn healthy() -> Self {
        Self {
            hard_fail: false,
            fail_after: None,
        }
    }

    /// Every subsequent call fails immediately.
    pub fn fail_now(&mut self) {
        self.hard_fail = true;
    }

    /// The next `count` calls succeed; every call after that fails.
    pub fn fail_after(&mut self, count: u32) {
        self.fail_after = Some(count);
    }

    /// Clears any armed fault, restoring healthy operation.
    pub fn heal(&mut self) {
        self.hard_fail = false;
        self.fail_after = None;
    }

    /// Consults and advances the injector's state for one call. Returns
    /// `true` if this call should be allowed to proceed normally, `false` if
    /// it should report a short transfer.
    pub fn poll(&mut self) -> bool {
        if self.hard_fail {
            return false;
        }

        match self.fail_after {
            Some(0) => false,
            Some(remaining) => {
                self.fail_after = Some(remaining - 1);
                true
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_injector_never_fails() {
        let mut injector = FaultInjector::healthy();
        for _ in 0..100 {
            assert!(injector.poll());
        }
    }

    #[test]
    fn fail_now_fails_immediately_and_permanently() {
        let mut injector = FaultInjector::healthy();
        injector.fail_now();
        assert!(!injector.poll());
        assert!(!injector.poll());
    }

    #[test]
    fn fail_after_lets_n_calls_through_then_fails() {
        let mut injector = FaultInjector::healthy();
        injector.fail_after(2);
        assert!(injector.poll());
        assert!(injector.poll());
        assert!(!injector.poll());
        assert!(!injector.poll());
    }

    #[test]
    fn heal_restores_healthy_operation() {
        let mut injector = FaultInjector::healthy();
        injector.fail_now();
        injector.heal();
        assert!(injector.poll());
    }
}
