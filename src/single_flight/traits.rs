// Producer seam for the single-flight gate

/// Long-running, synchronous producer of artifacts.
///
/// The gate invokes `compute` on a blocking worker, never on the polling
/// thread, and at most once concurrently per owner.
pub trait ComputationProvider<K, A>: Send + Sync + 'static {
    fn compute(&self, owner: &K) -> A;
}

impl<K, A, F> ComputationProvider<K, A> for F
where
    F: Fn(&K) -> A + Send + Sync + 'static,
{
    fn compute(&self, owner: &K) -> A {
        self(owner)
    }
}
