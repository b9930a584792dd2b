//! Memoization of scoped bindings.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread::{self, ThreadId};

use dagger_codegen::MemoizationStrategy;
use dagger_model::BindingKey;

use crate::error::{Result, RuntimeError};

/// A provided value.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Lock-guarded lazy initialisation.
///
/// At most one instance is ever retained. Callers racing the first access
/// block until the winner has finished and then observe its instance. A
/// thread that re-enters while it is constructing gets
/// [`RuntimeError::ReentrantScopedProvision`] instead of deadlocking.
#[derive(Debug)]
pub struct DoubleCheck {
    key: BindingKey,
    value: OnceLock<Instance>,
    lock: Mutex<()>,
    constructing: Mutex<Option<ThreadId>>,
}

impl DoubleCheck {
    pub fn new(key: BindingKey) -> Self {
        Self {
            key,
            value: OnceLock::new(),
            lock: Mutex::new(()),
            constructing: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Option<&Instance> {
        self.value.get()
    }

    pub fn get_or_init(&self, init: impl FnOnce() -> Result<Instance>) -> Result<Instance> {
        if let Some(value) = self.value.get() {
            return Ok(Arc::clone(value));
        }

        let current = thread::current().id();
        if *relock(&self.constructing) == Some(current) {
            return Err(RuntimeError::ReentrantScopedProvision {
                key: self.key.clone(),
            });
        }

        let _guard = relock(&self.lock);
        if let Some(value) = self.value.get() {
            return Ok(Arc::clone(value));
        }

        *relock(&self.constructing) = Some(current);
        let result = init();
        *relock(&self.constructing) = None;

        let instance = result?;
        Ok(Arc::clone(self.value.get_or_init(|| instance)))
    }
}

/// Publish-once memoization without locking.
///
/// Racing callers may each construct an instance; the first to publish
/// wins and every caller returns the published one.
#[derive(Debug, Default)]
pub struct SingleCheck {
    value: OnceLock<Instance>,
}

impl SingleCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Instance> {
        self.value.get()
    }

    pub fn get_or_init(&self, init: impl FnOnce() -> Result<Instance>) -> Result<Instance> {
        if let Some(value) = self.value.get() {
            return Ok(Arc::clone(value));
        }
        let instance = init()?;
        Ok(Arc::clone(self.value.get_or_init(|| instance)))
    }
}

/// A memoization cell of either strategy.
#[derive(Debug)]
pub enum Memo {
    Double(DoubleCheck),
    Single(SingleCheck),
}

impl Memo {
    pub fn new(strategy: MemoizationStrategy, key: BindingKey) -> Self {
        match strategy {
            MemoizationStrategy::DoubleCheck => Memo::Double(DoubleCheck::new(key)),
            MemoizationStrategy::SingleCheck => Memo::Single(SingleCheck::new()),
        }
    }

    pub fn get_or_init(&self, init: impl FnOnce() -> Result<Instance>) -> Result<Instance> {
        match self {
            Memo::Double(cell) => cell.get_or_init(init),
            Memo::Single(cell) => cell.get_or_init(init),
        }
    }
}

/// Locks `mutex`, recovering the data of a poisoned lock.
pub(crate) fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
