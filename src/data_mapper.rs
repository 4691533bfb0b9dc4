//! Prepared statement execution.
//!
//! The [`DataMapper`] holds one live statement at a time: `prepare` replaces
//! it, `bind_params` fills its named parameters, `execute` runs it and
//! buffers the result set for `result`/`results`.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;
use sqlx::any::AnyRow;
use sqlx::Statement as _;
use sqlx::{Column, Executor, Row, TypeInfo};

use crate::connection::{ConnectionProvider, DbConnection};
use crate::error::{BakeError, BakeResult};
use crate::placeholder::{self, CompiledSql};
use crate::query_builder::Dialect;
use crate::value::{Fields, ResultRow, SqlValue};

/// Binds and executes statements against one owned connection.
pub struct DataMapper<P = DbConnection> {
    dbh: P,
    stmt: Option<Statement>,
    last_id: i64,
}

#[derive(Debug)]
struct Statement {
    compiled: CompiledSql,
    /// The prepared statement describes result columns.
    returns_rows: bool,
    bindings: HashMap<String, SqlValue>,
    rows: VecDeque<ResultRow>,
    row_count: u64,
}

impl Statement {
    /// Bound values in slot order.
    fn arguments(&self) -> BakeResult<Vec<&SqlValue>> {
        self.compiled
            .slots
            .iter()
            .map(|name| {
                self.bindings
                    .get(name)
                    .ok_or_else(|| BakeError::Bind(format!("no value bound for :{}", name)))
            })
            .collect()
    }
}

impl<P: ConnectionProvider> DataMapper<P> {
    pub fn new(dbh: P) -> Self {
        Self {
            dbh,
            stmt: None,
            last_id: 0,
        }
    }

    pub fn connection(&self) -> &P {
        &self.dbh
    }

    /// Open the connection if needed and prepare `sql`.
    ///
    /// The engine validates the statement here, so unknown tables or
    /// malformed SQL fail before anything is bound.
    pub async fn prepare(&mut self, sql: &str) -> BakeResult<&mut Self> {
        let compiled = placeholder::compile(sql, self.dbh.dialect().placeholder_style())?;

        let conn = self.dbh.open().await?;
        let prepared = conn
            .prepare(&compiled.sql)
            .await
            .map_err(|e| BakeError::execution(sql, e))?;
        let returns_rows = !prepared.columns().is_empty();

        tracing::debug!(sql, params = compiled.slots.len(), returns_rows, "prepared");
        self.stmt = Some(Statement {
            compiled,
            returns_rows,
            bindings: HashMap::new(),
            rows: VecDeque::new(),
            row_count: 0,
        });
        Ok(self)
    }

    /// Bind every `key => value` of `fields` to `:key`.
    ///
    /// With `is_search` each value is bound as the text `%value%`.
    pub fn bind_params(&mut self, fields: &Fields, is_search: bool) -> BakeResult<&mut Self> {
        let stmt = self
            .stmt
            .as_mut()
            .ok_or_else(|| BakeError::config("bind_params called before prepare"))?;

        for (key, value) in fields {
            if !stmt.compiled.defines(key) {
                return Err(BakeError::Bind(format!(
                    "parameter :{} is not defined by the statement",
                    key
                )));
            }
            let bound = if is_search {
                SqlValue::search(value)
            } else {
                SqlValue::from_json(value)
            };
            tracing::trace!(param = %key, bind_type = ?bound.bind_type(), "bound");
            stmt.bindings.insert(key.clone(), bound);
        }
        Ok(self)
    }

    /// Like [`bind_params`](Self::bind_params) for an untyped payload.
    ///
    /// Returns `Ok(false)` and binds nothing when `fields` is not a mapping.
    pub fn bind_value(&mut self, fields: &Value, is_search: bool) -> BakeResult<bool> {
        match fields {
            Value::Object(map) => {
                self.bind_params(map, is_search)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Run the prepared statement. `Ok(false)` when nothing is prepared.
    pub async fn execute(&mut self) -> BakeResult<bool> {
        let Some(stmt) = self.stmt.as_ref() else {
            return Ok(false);
        };
        let sql = stmt.compiled.sql.clone();
        let returns_rows = stmt.returns_rows;
        let args = stmt.arguments()?;

        let mut query = sqlx::query(&sql);
        for value in args {
            query = match value {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Int(v) => query.bind(*v),
                SqlValue::String(v) => query.bind(v.as_str()),
            };
        }

        let conn = self.dbh.open().await?;
        let (rows, affected, mut last_id) = if returns_rows {
            let rows: VecDeque<ResultRow> = query
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| BakeError::execution(sql.as_str(), e))?
                .iter()
                .map(row_to_map)
                .collect();
            (rows, 0, None)
        } else {
            let done = query
                .execute(&mut *conn)
                .await
                .map_err(|e| BakeError::execution(sql.as_str(), e))?;
            (VecDeque::new(), done.rows_affected(), done.last_insert_id())
        };

        if last_id.is_none() && affected > 0 && is_insert(&sql) {
            last_id = self.fetch_last_insert_id().await?;
        }

        let row_count = if rows.is_empty() {
            affected
        } else {
            rows.len() as u64
        };
        tracing::debug!(sql = %sql, rows = rows.len(), affected, ?last_id, "executed");

        if let Some(id) = last_id {
            self.last_id = id;
        }
        if let Some(stmt) = self.stmt.as_mut() {
            stmt.rows = rows;
            stmt.row_count = row_count;
        }
        Ok(true)
    }

    /// Rows returned or affected by the last execution; 0 with no statement.
    pub fn num_rows(&self) -> u64 {
        self.stmt.as_ref().map_or(0, |s| s.row_count)
    }

    /// Take the next buffered row.
    pub fn result(&mut self) -> Option<ResultRow> {
        self.stmt.as_mut().and_then(|s| s.rows.pop_front())
    }

    /// Take all remaining buffered rows.
    pub fn results(&mut self) -> Vec<ResultRow> {
        self.stmt
            .as_mut()
            .map(|s| s.rows.drain(..).collect())
            .unwrap_or_default()
    }

    /// Auto-increment id of the last insert on this connection, or 0.
    pub fn get_last_id(&self) -> i64 {
        self.last_id
    }

    /// Read the generated id with the dialect's follow-up query, on the
    /// connection that ran the insert.
    async fn fetch_last_insert_id(&mut self) -> BakeResult<Option<i64>> {
        let dialect = self.dbh.dialect();
        let Some(sql) = dialect.last_insert_id_query() else {
            return Ok(None);
        };
        let conn = self.dbh.open().await?;
        match sqlx::query_scalar::<_, i64>(sql).fetch_one(&mut *conn).await {
            Ok(id) => Ok(Some(id)),
            // lastval() fails when the insert touched no sequence.
            Err(e) if dialect == Dialect::Postgres => {
                tracing::debug!(error = %e, "no sequence value for last insert");
                Ok(None)
            }
            Err(e) => Err(BakeError::execution(sql, e)),
        }
    }

    /// Drop the live statement and close the connection.
    pub async fn close(&mut self) -> BakeResult<()> {
        self.stmt = None;
        self.dbh.close().await
    }
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|word| word.eq_ignore_ascii_case("insert"))
}

/// Convert an AnyRow to a column-ordered map.
fn row_to_map(row: &AnyRow) -> ResultRow {
    let mut map = ResultRow::new();

    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let type_name = column.type_info().name();

        let value: Value = match type_name {
            "BOOL" | "BOOLEAN" => row
                .try_get::<Option<bool>, _>(i)
                .ok()
                .flatten()
                .map(Value::Bool)
                .unwrap_or(Value::Null),
            "SMALLINT" | "INTEGER" | "BIGINT" | "INT2" | "INT4" | "INT8" => row
                .try_get::<Option<i64>, _>(i)
                .or_else(|_| row.try_get::<Option<i32>, _>(i).map(|v| v.map(i64::from)))
                .ok()
                .flatten()
                .map(|v| Value::Number(v.into()))
                .unwrap_or(Value::Null),
            "REAL" | "DOUBLE" | "FLOAT4" | "FLOAT8" => row
                .try_get::<Option<f64>, _>(i)
                .or_else(|_| row.try_get::<Option<f32>, _>(i).map(|v| v.map(f64::from)))
                .ok()
                .flatten()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            "BLOB" => row
                .try_get::<Option<Vec<u8>>, _>(i)
                .ok()
                .flatten()
                .map(|v| Value::String(String::from_utf8_lossy(&v).into_owned()))
                .unwrap_or(Value::Null),
            // Expression columns carry no declared type; go by the value.
            _ => row
                .try_get::<Option<String>, _>(i)
                .map(|v| v.map(Value::String))
                .or_else(|_| {
                    row.try_get::<Option<i64>, _>(i)
                        .map(|v| v.map(|n| Value::Number(n.into())))
                })
                .or_else(|_| {
                    row.try_get::<Option<f64>, _>(i)
                        .map(|v| v.and_then(serde_json::Number::from_f64).map(Value::Number))
                })
                .ok()
                .flatten()
                .unwrap_or(Value::Null),
        };

        map.insert(name, value);
    }

    map
}
