//! Domain-facing finders built on an [`EntityManager`].
//!
//! Conditions and payloads accept anything that serializes to a mapping:
//! a `serde_json::json!({...})` object, a [`Fields`] map or a
//! `#[derive(Serialize)]` struct. Anything else is a validation error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::crud::{Crud, CrudOps};
use crate::entity_manager::EntityManager;
use crate::error::{BakeError, BakeResult};
use crate::query_builder::ReadOptions;
use crate::value::{to_fields, Fields, ResultRow};

/// One page of a paged query, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: u32,
    pub per_page: u32,
}

impl Paging {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    fn options(self) -> BakeResult<ReadOptions> {
        if self.page == 0 || self.per_page == 0 {
            return Err(BakeError::validation("page and per_page start at 1"));
        }
        let offset = i64::from(self.page - 1) * i64::from(self.per_page);
        Ok(ReadOptions::new()
            .limit(i64::from(self.per_page))
            .offset(offset))
    }
}

/// Finder API for one table.
#[derive(Debug)]
pub struct DataRepository<C = Crud> {
    em: EntityManager<C>,
}

impl<C: CrudOps> DataRepository<C> {
    pub fn new(em: EntityManager<C>) -> Self {
        Self { em }
    }

    pub fn entity_manager(&mut self) -> &mut EntityManager<C> {
        &mut self.em
    }

    /// The row whose primary key is `id`. `id` must not be 0.
    pub async fn find(&mut self, id: i64) -> BakeResult<Option<ResultRow>> {
        ensure_id(id)?;
        let conditions = self.id_condition(id);
        self.find_one_by(&conditions).await
    }

    pub async fn find_all(&mut self) -> BakeResult<Vec<ResultRow>> {
        self.em
            .crud_mut()
            .read(&[], &Fields::new(), &Fields::new(), &ReadOptions::default())
            .await
    }

    pub async fn find_by<S>(
        &mut self,
        selectors: &[String],
        conditions: &S,
        params: &Fields,
        optional: &ReadOptions,
    ) -> BakeResult<Vec<ResultRow>>
    where
        S: Serialize + ?Sized,
    {
        let conditions = to_fields(conditions, "conditions")?;
        self.em
            .crud_mut()
            .read(selectors, &conditions, params, optional)
            .await
    }

    /// The first row matching `conditions`.
    pub async fn find_one_by<S>(&mut self, conditions: &S) -> BakeResult<Option<ResultRow>>
    where
        S: Serialize + ?Sized,
    {
        let conditions = to_fields(conditions, "conditions")?;
        let rows = self
            .em
            .crud_mut()
            .read(&[], &conditions, &Fields::new(), &ReadOptions::default())
            .await?;
        Ok(rows.into_iter().next())
    }

    /// The first row matching `conditions`, deserialized into `T`.
    pub async fn find_object_by<T, S>(
        &mut self,
        conditions: &S,
        selectors: &[String],
    ) -> BakeResult<Option<T>>
    where
        T: DeserializeOwned,
        S: Serialize + ?Sized,
    {
        let conditions = to_fields(conditions, "conditions")?;
        let rows = self
            .em
            .crud_mut()
            .read(selectors, &conditions, &Fields::new(), &ReadOptions::default())
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(Value::Object(row))?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_search<S>(
        &mut self,
        selectors: &[String],
        conditions: &S,
        optional: &ReadOptions,
    ) -> BakeResult<Vec<ResultRow>>
    where
        S: Serialize + ?Sized,
    {
        let conditions = to_fields(conditions, "conditions")?;
        self.em
            .crud_mut()
            .search(selectors, &conditions, optional)
            .await
    }

    /// One page of the rows matching `conditions` as LIKE patterns.
    pub async fn find_by_search_and_paging<S>(
        &mut self,
        selectors: &[String],
        conditions: &S,
        paging: Paging,
    ) -> BakeResult<Vec<ResultRow>>
    where
        S: Serialize + ?Sized,
    {
        let options = paging.options()?;
        self.find_by_search(selectors, conditions, &options).await
    }

    /// Delete the row with primary key `id`, if it also matches `conditions`.
    ///
    /// Returns `false`, without issuing a DELETE, when no such row exists.
    pub async fn find_by_id_and_delete<S>(&mut self, conditions: &S, id: i64) -> BakeResult<bool>
    where
        S: Serialize + ?Sized,
    {
        ensure_id(id)?;
        let extra = to_fields(conditions, "conditions")?;

        let pk = self.em.crud().schema_id().to_string();
        let mut conditions = self.id_condition(id);
        conditions.extend(extra.into_iter().filter(|(k, _)| *k != pk));

        if self.find_one_by(&conditions).await?.is_none() {
            return Ok(false);
        }
        self.em.crud_mut().delete(&conditions).await
    }

    /// Update the row with primary key `id` from `fields`.
    ///
    /// Returns `false`, without issuing an UPDATE, when no such row exists.
    pub async fn find_by_id_and_update<S>(&mut self, fields: &S, id: i64) -> BakeResult<bool>
    where
        S: Serialize + ?Sized,
    {
        ensure_id(id)?;
        let fields = to_fields(fields, "fields")?;

        let pk = self.em.crud().schema_id().to_string();
        let mut payload = self.id_condition(id);
        payload.extend(fields.into_iter().filter(|(k, _)| *k != pk));
        if payload.len() < 2 {
            return Err(BakeError::validation("fields has nothing to update"));
        }

        let conditions = self.id_condition(id);
        if self.find_one_by(&conditions).await?.is_none() {
            return Ok(false);
        }
        self.em.crud_mut().update(&payload, &pk).await
    }

    fn id_condition(&self, id: i64) -> Fields {
        let mut conditions = Fields::new();
        conditions.insert(self.em.crud().schema_id().to_string(), id.into());
        conditions
    }
}

fn ensure_id(id: i64) -> BakeResult<()> {
    if id == 0 {
        return Err(BakeError::validation("The id cannot be empty."));
    }
    Ok(())
}
