//! RAII guard for checked-out resources

use std::sync::Arc;

use crate::slots::{Origin, Slots};

/// A resource checked out of a [`Pool`](crate::Pool).
///
/// The caller owns the resource exclusively while the guard is alive. When
/// the guard is dropped the resource goes back to the pool, on every exit
/// path: normal return, `?`, or unwinding. If the pool has been shut down or
/// is already full, the resource is dropped along with the guard instead.
///
/// Use [`Pooled::detach`] to keep the resource beyond the guard.
#[must_use = "dropping the guard immediately returns the resource to the pool"]
pub struct Pooled<R> {
    resource: Option<R>,
    slots: Arc<Slots<R>>,
}

impl<R> Pooled<R> {
    pub(crate) fn new(resource: R, slots: Arc<Slots<R>>) -> Self {
        Self {
            resource: Some(resource),
            slots,
        }
    }

    /// Take the resource out of pool accounting for good.
    ///
    /// Under [`AcquirePolicy::Grow`](crate::AcquirePolicy::Grow) this frees a
    /// slot for the factory. The resource can later be handed back with
    /// [`Pool::release`](crate::Pool::release).
    pub fn detach(mut this: Self) -> R {
        let resource = this.resource.take().expect("guard used after detach");
        this.slots.detach();
        resource
    }
}

impl<R> std::ops::Deref for Pooled<R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.resource.as_ref().expect("guard used after detach")
    }
}

impl<R> std::ops::DerefMut for Pooled<R> {
    fn deref_mut(&mut self) -> &mut R {
        self.resource.as_mut().expect("guard used after detach")
    }
}

impl<R> AsRef<R> for Pooled<R> {
    fn as_ref(&self) -> &R {
        self
    }
}

impl<R> Drop for Pooled<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            // A refused resource is disposed of right here, in the caller's scope.
            drop(self.slots.put(resource, Origin::Pooled));
        }
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for Pooled<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pooled")
            .field("resource", &self.resource)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcquirePolicy;
    use crate::slots::Wait;

    async fn checked_out(slots: &Arc<Slots<String>>) -> Pooled<String> {
        match slots.claim(Wait::Never).await {
            Ok(crate::slots::Claim::Idle(resource)) => Pooled::new(resource, Arc::clone(slots)),
            _ => panic!("expected an idle resource"),
        }
    }

    #[tokio::test]
    async fn guard_deref() {
        let slots = Arc::new(Slots::new(vec![String::from("a")], 1, AcquirePolicy::Wait));
        let guard = checked_out(&slots).await;
        assert_eq!(*guard, "a");
        let inner: &String = guard.as_ref();
        assert_eq!(inner, "a");
    }

    #[tokio::test]
    async fn guard_drop_returns_resource() {
        let slots = Arc::new(Slots::new(vec![String::from("a")], 1, AcquirePolicy::Wait));
        let guard = checked_out(&slots).await;
        assert_eq!(slots.len(), 0);
        drop(guard);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.stats().in_use, 0);
    }

    #[tokio::test]
    async fn guard_detach_skips_return() {
        let slots = Arc::new(Slots::new(vec![String::from("a")], 1, AcquirePolicy::Wait));
        let guard = checked_out(&slots).await;
        let resource = Pooled::detach(guard);
        assert_eq!(resource, "a");
        assert_eq!(slots.len(), 0);
        assert_eq!(slots.stats().in_use, 0);
    }

    #[tokio::test]
    async fn guard_deref_mut() {
        let slots = Arc::new(Slots::new(vec![String::from("hello")], 1, AcquirePolicy::Wait));
        let mut guard = checked_out(&slots).await;
        guard.push_str(" world");
        drop(guard);
        let guard = checked_out(&slots).await;
        assert_eq!(*guard, "hello world");
    }
}
