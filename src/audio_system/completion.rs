/// One-shot completion signal for a playback instance
///
/// A [`Resolver`] is consumed when it fires, so each [`Completion`] resolves
/// at most once. The completion can be awaited, or polled with
/// [`Completion::is_resolved`] by hosts that drive the engine from a frame
/// loop.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

#[derive(Default)]
struct Inner {
    resolved: bool,
    waker: Option<Waker>,
}

/// Future that resolves when a sound finishes playing
#[derive(Clone)]
pub struct Completion {
    inner: Arc<Mutex<Inner>>,
}

/// Write side of a [`Completion`]
pub struct Resolver {
    inner: Arc<Mutex<Inner>>,
}

impl Completion {
    /// Create a pending completion and the resolver that fires it
    pub fn pending() -> (Completion, Resolver) {
        let inner = Arc::new(Mutex::new(Inner::default()));
        (
            Completion {
                inner: Arc::clone(&inner),
            },
            Resolver { inner },
        )
    }

    /// Completion that is already finished, for plays that never start
    pub fn resolved() -> Completion {
        let (completion, resolver) = Completion::pending();
        resolver.resolve();
        completion
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.lock().resolved
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl Resolver {
    pub fn resolve(self) {
        let waker = {
            let mut inner = self.inner.lock();
            inner.resolved = true;
            inner.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut inner = self.inner.lock();
        if inner.resolved {
            Poll::Ready(())
        } else {
            inner.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_pending_until_resolved() {
        let (completion, resolver) = Completion::pending();
        assert!(!completion.is_resolved());

        resolver.resolve();
        assert!(completion.is_resolved());
    }

    #[test]
    fn test_already_resolved() {
        assert!(Completion::resolved().is_resolved());
    }

    #[test]
    fn test_poll_wakes_on_resolve() {
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&counter));
        let mut cx = Context::from_waker(&waker);

        let (mut completion, resolver) = Completion::pending();
        assert!(Pin::new(&mut completion).poll(&mut cx).is_pending());

        resolver.resolve();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(Pin::new(&mut completion).poll(&mut cx).is_ready());
    }

    #[test]
    fn test_clones_observe_same_resolution() {
        let (completion, resolver) = Completion::pending();
        let other = completion.clone();
        resolver.resolve();
        assert!(other.is_resolved());
    }
}
