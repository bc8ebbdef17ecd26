use crate::executor::QueryExecutor;
use crate::model::Model;
use std::marker::PhantomData;

/// Per-model record store running statements through a shared executor
pub struct ModelStore<T: Model> {
    pub(crate) executor: QueryExecutor,
    pub(crate) _phantom: PhantomData<fn() -> T>,
}

impl<T: Model> std::fmt::Debug for ModelStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("table", &T::schema().table_name())
            .field("executor", &self.executor)
            .finish()
    }
}

impl<T: Model> Clone for ModelStore<T> {
    fn clone(&self) -> Self {
        Self::new(self.executor.clone())
    }
}

impl<T: Model> ModelStore<T> {
    pub fn new(executor: QueryExecutor) -> Self {
        Self {
            executor,
            _phantom: PhantomData,
        }
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }
}
