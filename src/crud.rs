//! Per-table create/read/update/delete/search.
//!
//! A [`Crud`] is bound to one table and its primary key column. Every
//! operation builds its statement with the [`QueryBuilder`], then prepares,
//! binds and executes it through the [`DataMapper`].
//!
//! Writes report `true` only when exactly one row was affected; zero rows,
//! or two and more, report `false`. Reads report an empty `Vec` when nothing
//! matched. Engine failures are returned as errors, untouched.

use async_trait::async_trait;

use crate::connection::{ConnectionProvider, DbConnection};
use crate::data_mapper::DataMapper;
use crate::error::{BakeError, BakeResult};
use crate::query_builder::{
    check_identifier, DeleteSpec, InsertSpec, QueryArgs, QueryBuilder, QueryKind, ReadOptions,
    SelectSpec, UpdateSpec,
};
use crate::value::{Fields, ResultRow};

/// A table name and its primary key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    primary_key: String,
}

impl TableSchema {
    /// Both names must be plain identifiers; the table may be schema-qualified.
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> BakeResult<Self> {
        let name = name.into();
        let primary_key = primary_key.into();

        if name.is_empty() {
            return Err(BakeError::config("table name cannot be empty"));
        }
        for part in name.split('.') {
            check_identifier(part)?;
        }
        check_identifier(&primary_key)?;

        Ok(Self { name, primary_key })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }
}

/// Data access operations for one table.
#[async_trait]
pub trait CrudOps: Send {
    /// The table name.
    fn schema(&self) -> &str;

    /// The primary key column.
    fn schema_id(&self) -> &str;

    /// Id assigned by the last insert, or 0.
    fn last_id(&self) -> i64;

    async fn create(&mut self, fields: &Fields) -> BakeResult<bool>;

    /// Select `selectors` (all columns when empty) of the rows matching every
    /// condition. `params` binds extra placeholders.
    async fn read(
        &mut self,
        selectors: &[String],
        conditions: &Fields,
        params: &Fields,
        optional: &ReadOptions,
    ) -> BakeResult<Vec<ResultRow>>;

    /// Update the row whose `primary_key` column equals `fields[primary_key]`.
    async fn update(&mut self, fields: &Fields, primary_key: &str) -> BakeResult<bool>;

    /// Delete the row matching the first condition.
    async fn delete(&mut self, conditions: &Fields) -> BakeResult<bool>;

    /// Like `read`, with every condition a `LIKE '%value%'` match.
    async fn search(
        &mut self,
        selectors: &[String],
        conditions: &Fields,
        optional: &ReadOptions,
    ) -> BakeResult<Vec<ResultRow>>;

    /// Run caller-written SQL with named parameters.
    async fn raw_query(&mut self, sql: &str, params: &Fields) -> BakeResult<Vec<ResultRow>>;
}

/// [`CrudOps`] over a [`DataMapper`] and a [`QueryBuilder`].
pub struct Crud<P = DbConnection> {
    data_mapper: DataMapper<P>,
    query_builder: QueryBuilder,
    schema: TableSchema,
}

impl<P: ConnectionProvider> Crud<P> {
    pub fn new(data_mapper: DataMapper<P>, query_builder: QueryBuilder, schema: TableSchema) -> Self {
        Self {
            data_mapper,
            query_builder,
            schema,
        }
    }

    pub fn table(&self) -> &TableSchema {
        &self.schema
    }

    pub fn query_builder(&self) -> &QueryBuilder {
        &self.query_builder
    }

    pub fn data_mapper(&mut self) -> &mut DataMapper<P> {
        &mut self.data_mapper
    }

    /// Close the underlying connection.
    pub async fn close(&mut self) -> BakeResult<()> {
        self.data_mapper.close().await
    }

    /// Prepare, bind and execute `sql`.
    async fn persist(&mut self, kind: QueryKind, sql: &str, params: &Fields) -> BakeResult<()> {
        if sql.is_empty() {
            return Err(BakeError::config(format!(
                "{} on '{}' produced no statement",
                kind, self.schema.name
            )));
        }
        tracing::debug!(table = %self.schema.name, %kind, "persist");
        self.data_mapper
            .prepare(sql)
            .await?
            .bind_params(params, false)?;
        self.data_mapper.execute().await?;
        Ok(())
    }

    fn rows_if_any(&mut self) -> Vec<ResultRow> {
        if self.data_mapper.num_rows() > 0 {
            self.data_mapper.results()
        } else {
            Vec::new()
        }
    }
}

#[async_trait]
impl<P: ConnectionProvider> CrudOps for Crud<P> {
    fn schema(&self) -> &str {
        &self.schema.name
    }

    fn schema_id(&self) -> &str {
        &self.schema.primary_key
    }

    fn last_id(&self) -> i64 {
        self.data_mapper.get_last_id()
    }

    async fn create(&mut self, fields: &Fields) -> BakeResult<bool> {
        let spec = InsertSpec::new(self.schema.name.clone(), fields.clone());
        let sql = self.query_builder.build_query(spec).insert_query()?;
        self.persist(QueryKind::Insert, &sql, fields).await?;
        Ok(self.data_mapper.num_rows() == 1)
    }

    async fn read(
        &mut self,
        selectors: &[String],
        conditions: &Fields,
        params: &Fields,
        optional: &ReadOptions,
    ) -> BakeResult<Vec<ResultRow>> {
        let spec = SelectSpec::new(self.schema.name.clone())
            .selectors(selectors.iter().cloned())
            .conditions(conditions.clone())
            .options(optional.clone());
        let sql = self.query_builder.build_query(spec).select_query()?;

        let mut bound = conditions.clone();
        bound.extend(params.clone());
        bound.extend(optional.paging_params());
        self.persist(QueryKind::Select, &sql, &bound).await?;

        Ok(self.rows_if_any())
    }

    async fn update(&mut self, fields: &Fields, primary_key: &str) -> BakeResult<bool> {
        let spec = UpdateSpec::new(self.schema.name.clone(), fields.clone(), primary_key);
        let sql = self.query_builder.build_query(spec).update_query()?;
        self.persist(QueryKind::Update, &sql, fields).await?;
        Ok(self.data_mapper.num_rows() == 1)
    }

    async fn delete(&mut self, conditions: &Fields) -> BakeResult<bool> {
        let spec = DeleteSpec::new(self.schema.name.clone(), conditions.clone());
        let sql = self.query_builder.build_query(spec).delete_query()?;

        // Only the first condition is part of the statement.
        let key: Fields = conditions
            .iter()
            .take(1)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.persist(QueryKind::Delete, &sql, &key).await?;
        Ok(self.data_mapper.num_rows() == 1)
    }

    async fn search(
        &mut self,
        selectors: &[String],
        conditions: &Fields,
        optional: &ReadOptions,
    ) -> BakeResult<Vec<ResultRow>> {
        let spec = SelectSpec::new(self.schema.name.clone())
            .selectors(selectors.iter().cloned())
            .conditions(conditions.clone())
            .options(optional.clone());
        let sql = self.query_builder.build_query(spec).search_query()?;
        if sql.is_empty() {
            return Err(BakeError::config(format!(
                "search on '{}' produced no statement",
                self.schema.name
            )));
        }

        self.data_mapper
            .prepare(&sql)
            .await?
            .bind_params(conditions, true)?
            .bind_params(&optional.paging_params(), false)?;
        self.data_mapper.execute().await?;

        Ok(self.rows_if_any())
    }

    async fn raw_query(&mut self, sql: &str, params: &Fields) -> BakeResult<Vec<ResultRow>> {
        let args = QueryArgs::new(self.schema.name.clone(), QueryKind::Raw).raw(sql);
        let sql = self.query_builder.build_query(args).raw_query()?;
        self.persist(QueryKind::Raw, &sql, params).await?;
        Ok(self.data_mapper.results())
    }
}
