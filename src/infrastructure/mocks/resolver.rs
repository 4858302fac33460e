//! Scripted domain resolver.

use crate::application::ports::{DomainResolver, ResolveError};
use crate::domain::snapshot::DomainSnapshot;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type ErrorFactory = Arc<dyn Fn() -> ResolveError + Send + Sync>;

#[derive(Clone)]
enum Answer {
    Found(DomainSnapshot),
    Fails(ErrorFactory),
}

/// Domain resolver answering from a fixed table.
///
/// Unknown identifiers resolve to [`ResolveError::NotFound`]. Clones share the
/// table and the call counter.
///
/// ```
/// use task_priority::infrastructure::mocks::MockDomainResolver;
/// use task_priority::{DomainResolver, DomainSnapshot};
///
/// let resolver = MockDomainResolver::new();
/// resolver.insert("id-1", DomainSnapshot::local("orders"));
///
/// assert_eq!(resolver.resolve_by_id("id-1").unwrap().name, "orders");
/// assert!(resolver.resolve_by_id("id-2").unwrap_err().is_not_found());
/// assert_eq!(resolver.calls(), 2);
/// ```
#[derive(Clone, Default)]
pub struct MockDomainResolver {
    answers: Arc<Mutex<HashMap<String, Answer>>>,
    calls: Arc<AtomicUsize>,
}

impl MockDomainResolver {
    /// Create a resolver that knows no domains.
    pub fn new() -> Self {
        Self::default()
    }

    fn answers(&self) -> std::sync::MutexGuard<'_, HashMap<String, Answer>> {
        self.answers.lock().expect(
            "MockDomainResolver mutex poisoned - a test thread panicked while holding the lock",
        )
    }

    /// Resolve `domain_id` to `snapshot`.
    pub fn insert(&self, domain_id: impl Into<String>, snapshot: DomainSnapshot) {
        self.answers()
            .insert(domain_id.into(), Answer::Found(snapshot));
    }

    /// Fail lookups of `domain_id` with the error built by `make_error`.
    pub fn insert_error<F>(&self, domain_id: impl Into<String>, make_error: F)
    where
        F: Fn() -> ResolveError + Send + Sync + 'static,
    {
        self.answers()
            .insert(domain_id.into(), Answer::Fails(Arc::new(make_error)));
    }

    /// Number of `resolve_by_id` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DomainResolver for MockDomainResolver {
    fn resolve_by_id(&self, domain_id: &str) -> Result<DomainSnapshot, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.answers().get(domain_id).cloned();
        match answer {
            Some(Answer::Found(snapshot)) => Ok(snapshot),
            Some(Answer::Fails(make_error)) => Err(make_error()),
            None => Err(ResolveError::not_found(domain_id)),
        }
    }
}

impl fmt::Debug for MockDomainResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDomainResolver")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}
