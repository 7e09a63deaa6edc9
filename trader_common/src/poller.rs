//! Cancellable periodic task running on its own thread.
//!
//! A `Poller` runs a closure right after it is spawned and then again `interval`
//! after each previous run returned, so runs never overlap. Stopping is synchronous:
//! [`Poller::stop`] signals the thread over a crossbeam channel and joins it, so once
//! it returns the closure will not be called again.
//!
//! Design notes:
//! - The wait between runs is a `select!` on the stop channel with a `default`
//!   timeout, so a stop request interrupts the wait immediately instead of sleeping
//!   out the interval.
//! - A stop requested while the closure is running takes effect when it returns.
//! - A run that panics is logged and the next run happens as scheduled.
//! - Stopping from any poller thread (its own task or another poller's) only
//!   signals; joining there could wait on a thread that is itself joining us. The
//!   stopped poller exits once its current run returns.

use crossbeam_channel::{Receiver, Sender, bounded, select};
use log::{debug, error};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::result::Result;

thread_local! {
    static ON_POLLER_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Handle to a running periodic task. Dropping it stops the task.
pub struct Poller {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn a named thread that calls `task` every `interval`.
    pub fn spawn<F>(name: impl Into<String>, interval: Duration, mut task: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let thread_name = name.clone();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            ON_POLLER_THREAD.with(|flag| flag.set(true));
            run_loop(&thread_name, interval, &stop_rx, &mut task)
        })?;
        debug!("Poller {} spawned (interval {:?})", name, interval);

        Ok(Self {
            name,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Thread name of this poller.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` once the thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Signal the task and wait for its thread to exit.
    ///
    /// Called from a poller thread this does not wait; see the module docs.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel, which wakes the loop even if
        // the stop message could not be queued.
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        let Some(handle) = self.handle.take() else {
            return;
        };
        if ON_POLLER_THREAD.with(Cell::get) {
            debug!("Poller {} stopped from a poller thread, not joining", self.name);
            return;
        }
        if handle.join().is_err() {
            error!("Poller {} thread panicked", self.name);
        } else {
            debug!("Poller {} stopped", self.name);
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Human readable text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn run_loop<F: FnMut()>(name: &str, interval: Duration, stop_rx: &Receiver<()>, task: &mut F) {
    loop {
        if !stop_rx.is_empty() {
            break;
        }
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(&mut *task)) {
            error!("Poller {} run panicked: {}", name, panic_message(payload.as_ref()));
        }
        select! {
            recv(stop_rx) -> _ => break,
            default(interval) => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, Mutex};
    use std::time::Instant;

    #[test]
    fn runs_immediately_then_periodically() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let poller = Poller::spawn("test-poller", Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        thread::sleep(Duration::from_millis(60));
        poller.stop();
        assert!(runs.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn no_runs_after_stop_returns() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let poller = Poller::spawn("test-poller", Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        poller.stop();
        let after_stop = runs.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(runs.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn stop_interrupts_long_interval() {
        let poller = Poller::spawn("test-poller", Duration::from_secs(3600), || {}).unwrap();
        let started = Instant::now();
        thread::sleep(Duration::from_millis(5));
        poller.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn drop_stops_the_thread() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let poller = Poller::spawn("test-poller", Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(poller.name(), "test-poller");
        drop(poller);
        let after_drop = runs.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(runs.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn panicking_run_does_not_end_the_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let poller = Poller::spawn("test-poller", Duration::from_millis(1), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                panic!("boom");
            }
        })
        .unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(!poller.is_finished());
        poller.stop();
        assert!(runs.load(Ordering::SeqCst) >= 3);
    }

    fn static_panic() {
        panic!("static text");
    }

    fn formatted_panic() {
        panic!("formatted {}", 7);
    }

    #[test]
    fn panic_message_reads_payloads() {
        let payload = panic::catch_unwind(static_panic).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static text");
        let payload = panic::catch_unwind(formatted_panic).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 7");
    }

    #[test]
    fn pollers_stopping_each_other_do_not_deadlock() {
        let slot_a: Arc<Mutex<Option<Poller>>> = Arc::new(Mutex::new(None));
        let slot_b: Arc<Mutex<Option<Poller>>> = Arc::new(Mutex::new(None));
        let ready = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Barrier::new(2));
        let stopped = Arc::new(AtomicUsize::new(0));

        let spawn_stopper = |other: Arc<Mutex<Option<Poller>>>| {
            let (ready, barrier, stopped) =
                (Arc::clone(&ready), Arc::clone(&barrier), Arc::clone(&stopped));
            let mut fired = false;
            Poller::spawn("test-poller", Duration::from_millis(1), move || {
                if fired || !ready.load(Ordering::SeqCst) {
                    return;
                }
                fired = true;
                // both pollers are inside a run when they stop each other
                barrier.wait();
                let target = other.lock().unwrap().take();
                if let Some(poller) = target {
                    poller.stop();
                    stopped.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap()
        };
        let a = spawn_stopper(Arc::clone(&slot_b));
        let b = spawn_stopper(Arc::clone(&slot_a));
        *slot_a.lock().unwrap() = Some(a);
        *slot_b.lock().unwrap() = Some(b);
        ready.store(true, Ordering::SeqCst);

        let started = Instant::now();
        while stopped.load(Ordering::SeqCst) < 2 && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(stopped.load(Ordering::SeqCst), 2);
    }
}
