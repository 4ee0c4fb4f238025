//! Mutex/condvar shell shared by the pipeline's worker threads
//!
//! Every stage couples one mutex with an input condition and an output
//! condition. Waits are gated on a boolean that the signaller clears, so a
//! spurious wakeup simply re-enters the wait; because each queue is
//! single-producer single-consumer, one signal per event suffices.

use std::sync::{Condvar, Mutex, MutexGuard};

use tracing::error;

use crate::error::Result;

/// State guarded by a stage's mutex.
#[derive(Debug)]
pub(crate) struct Guarded<S> {
    /// Cleared to ask the worker to stop.
    pub keep_running: bool,
    /// True while the consumer-of-input side is parked.
    pub waiting_for_input: bool,
    /// True while the consumer-of-output side is parked.
    pub waiting_for_output: bool,
    /// Last work status; sticky once the worker stops.
    pub status: Result<()>,
    /// Stage-specific state.
    pub inner: S,
}

/// A mutex paired with input/output conditions: the shell every pipeline
/// worker is built on.
#[derive(Debug)]
pub(crate) struct Shared<S> {
    state: Mutex<Guarded<S>>,
    input: Condvar,
    output: Condvar,
}

impl<S> Shared<S> {
    pub fn new(inner: S) -> Self {
        Shared {
            state: Mutex::new(Guarded {
                keep_running: true,
                waiting_for_input: false,
                waiting_for_output: false,
                status: Ok(()),
                inner,
            }),
            input: Condvar::new(),
            output: Condvar::new(),
        }
    }

    /// Lock the stage state. A poisoned mutex means a thread died while
    /// holding a pool invariant, which nothing downstream can repair.
    pub fn lock(&self) -> MutexGuard<'_, Guarded<S>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => {
                error!("pipeline mutex poisoned");
                panic!("pipeline mutex poisoned");
            }
        }
    }

    /// Park until a producer signals input. The flag is cleared by the
    /// signaller, never by the wakeup itself.
    pub fn wait_for_input<'a>(
        &self,
        mut guard: MutexGuard<'a, Guarded<S>>,
    ) -> MutexGuard<'a, Guarded<S>> {
        debug_assert!(!guard.waiting_for_input);
        guard.waiting_for_input = true;
        while guard.waiting_for_input {
            guard = match self.input.wait(guard) {
                Ok(guard) => guard,
                Err(_) => {
                    error!("pipeline mutex poisoned");
                    panic!("pipeline mutex poisoned");
                }
            };
        }
        guard
    }

    /// Park until a producer signals output.
    pub fn wait_for_output<'a>(
        &self,
        mut guard: MutexGuard<'a, Guarded<S>>,
    ) -> MutexGuard<'a, Guarded<S>> {
        debug_assert!(!guard.waiting_for_output);
        guard.waiting_for_output = true;
        while guard.waiting_for_output {
            guard = match self.output.wait(guard) {
                Ok(guard) => guard,
                Err(_) => {
                    error!("pipeline mutex poisoned");
                    panic!("pipeline mutex poisoned");
                }
            };
        }
        guard
    }

    /// Wake the input waiter, if one is parked.
    pub fn signal_input(&self, guard: &mut Guarded<S>) {
        if guard.waiting_for_input {
            guard.waiting_for_input = false;
            self.input.notify_one();
        }
    }

    /// Wake the output waiter, if one is parked.
    pub fn signal_output(&self, guard: &mut Guarded<S>) {
        if guard.waiting_for_output {
            guard.waiting_for_output = false;
            self.output.notify_one();
        }
    }

    /// Ask the worker to stop and wake whichever wait it is parked in.
    pub fn request_stop(&self) {
        let mut guard = self.lock();
        guard.keep_running = false;
        self.signal_input(&mut guard);
        self.signal_output(&mut guard);
    }

    /// Publish a worker's terminal status and release any parked client.
    /// Run by the worker itself on an error exit, so a paired client
    /// thread is woken instead of blocking forever.
    pub fn publish_exit(&self, status: Result<()>) {
        let mut guard = self.lock();
        guard.keep_running = false;
        guard.status = status;
        self.signal_input(&mut guard);
        self.signal_output(&mut guard);
    }
}

/// Default work loop: call `work` until told to stop or it reports an
/// error, then publish the terminal status.
pub(crate) fn run_worker<S>(shared: &Shared<S>, mut work: impl FnMut() -> Result<()>) {
    loop {
        if !shared.lock().keep_running {
            break;
        }
        if let Err(err) = work() {
            shared.publish_exit(Err(err));
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_signal_clears_wait_flag() {
        let shared = Arc::new(Shared::new(0u32));
        let waiter = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            let mut guard = waiter.lock();
            guard = waiter.wait_for_input(guard);
            guard.inner
        });

        // Park, then publish a value and wake the waiter.
        loop {
            let mut guard = shared.lock();
            if guard.waiting_for_input {
                guard.inner = 7;
                shared.signal_input(&mut guard);
                break;
            }
        }
        assert_eq!(handle.join().unwrap(), 7);
    }

    #[test]
    fn test_request_stop_wakes_waiters() {
        let shared = Arc::new(Shared::new(()));
        let waiter = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            let guard = waiter.lock();
            let guard = waiter.wait_for_output(guard);
            guard.keep_running
        });

        loop {
            let guard = shared.lock();
            if guard.waiting_for_output {
                drop(guard);
                shared.request_stop();
                break;
            }
        }
        assert!(!handle.join().unwrap());
    }

    #[test]
    fn test_worker_publishes_error_exit() {
        let shared = Arc::new(Shared::new(()));
        run_worker(&shared, || Err(Error::EndOfStream));
        let guard = shared.lock();
        assert!(!guard.keep_running);
        assert_eq!(guard.status, Err(Error::EndOfStream));
    }
}
