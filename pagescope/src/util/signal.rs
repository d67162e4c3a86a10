use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll, Waker},
};

use parking_lot::Mutex;

/// A one-shot signal.
///
/// Once [`Signal::fire`] is called, every pending and future [`Fired`] resolves
/// immediately. Firing more than once has no further effect.
#[derive(Default)]
pub(crate) struct Signal {
    core: Mutex<Core>,
}

#[derive(Default)]
struct Core {
    fired: bool,
    wakers: Vec<Waker>,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Signal::default()
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.core.lock().fired
    }

    pub(crate) fn fire(&self) {
        let wakers = {
            let mut core = self.core.lock();
            core.fired = true;
            std::mem::take(&mut core.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
    }

    pub(crate) fn fired(&self) -> Fired<'_> {
        Fired { signal: self }
    }
}

/// A future that resolves once its [`Signal`] fired.
pub(crate) struct Fired<'a> {
    signal: &'a Signal,
}

impl<'a> Future for Fired<'a> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut core = self.signal.core.lock();
        if core.fired {
            return Poll::Ready(());
        }
        if !core.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            core.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
