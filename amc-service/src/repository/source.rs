//! Adapter from a repository query to a [`PageSource`]

use std::marker::PhantomData;

use async_trait::async_trait;

use super::traits::ReadRepository;
use crate::error::Result;
use crate::pagination::{PageSource, Window};

/// A filtered repository listing, counted and sliced by the pager
pub struct RepositorySource<'a, Entity, Filter, R: ?Sized> {
    repo: &'a R,
    filter: Filter,
    _entity: PhantomData<fn() -> Entity>,
}

impl<'a, Entity, Filter, R> RepositorySource<'a, Entity, Filter, R>
where
    Entity: Send + 'static,
    Filter: Sync + 'static,
    R: ReadRepository<Entity, Filter> + ?Sized,
{
    pub fn new(repo: &'a R, filter: Filter) -> Self {
        Self {
            repo,
            filter,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<'a, Entity, Filter, R> PageSource for RepositorySource<'a, Entity, Filter, R>
where
    Entity: Send + 'static,
    Filter: Send + Sync + 'static,
    R: ReadRepository<Entity, Filter> + ?Sized,
{
    type Item = Entity;

    async fn count(&self) -> Result<u64> {
        Ok(self.repo.count(&self.filter).await?)
    }

    async fn fetch(&self, window: Window) -> Result<Vec<Entity>> {
        Ok(self.repo.find_all(&self.filter, Some(window)).await?)
    }
}
