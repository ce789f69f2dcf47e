use std::thread;

/// # Pill
///
/// A panic escalation mechanism carried by the pipeline's background loops.
///
/// A panicking background task would otherwise unwind silently, leaving
/// every queued request waiting on a completion that will never arrive. Each
/// loop owns a `Pill`; when the pill is dropped during an unwind it panics
/// again, escalating the failure instead of letting waiters strand.
pub(crate) struct Pill {}

impl Pill {
    /// Creates a new `Pill` instance.
    pub fn new() -> Self {
        Self {}
    }
}

impl Drop for Pill {
    fn drop(&mut self) {
        if thread::panicking() {
            panic!("pipeline worker panicked - escalating to avoid stranded requests");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pill_is_inert_on_normal_drop() {
        let pill = Pill::new();
        drop(pill);
    }

    #[test]
    fn pill_escalates_inside_a_panicking_thread() {
        let handle = thread::spawn(|| {
            let _pill = Pill::new();
            panic!("intentional panic");
        });

        assert!(handle.join().is_err());
    }
}
