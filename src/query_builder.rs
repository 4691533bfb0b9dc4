//! SQL generation for BakeORM.
//!
//! A [`QueryBuilder`] is armed with a [`QueryArgs`] description and then
//! asked for the statement of one kind. Values never reach the SQL text:
//! every value is a named `:column` placeholder bound later by the
//! [`DataMapper`](crate::data_mapper::DataMapper). Table and column names
//! are interpolated, so they must come from code, never from user input.
//!
//! Asking for a statement of a kind other than the armed one, or with an
//! empty payload, yields an empty string rather than an error.

use std::fmt;
use std::str::FromStr;

use crate::error::{BakeError, BakeResult};
use crate::placeholder::PlaceholderStyle;
use crate::value::Fields;

/// The statement kinds a builder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Insert,
    Select,
    Update,
    Delete,
    Raw,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryKind::Insert => "insert",
            QueryKind::Select => "select",
            QueryKind::Update => "update",
            QueryKind::Delete => "delete",
            QueryKind::Raw => "raw",
        };
        f.write_str(name)
    }
}

impl FromStr for QueryKind {
    type Err = BakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Ok(QueryKind::Insert),
            "select" => Ok(QueryKind::Select),
            "update" => Ok(QueryKind::Update),
            "delete" => Ok(QueryKind::Delete),
            "raw" => Ok(QueryKind::Raw),
            other => Err(BakeError::config(format!(
                "Invalid query type: '{}'. Expected: insert, select, update, delete, or raw",
                other
            ))),
        }
    }
}

/// SQL flavour of the target engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    MySql,
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Pick the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> BakeResult<Self> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(BakeError::construction(
                other,
                "unsupported database driver (expected mysql, sqlite or postgres)",
            )),
        }
    }

    /// How positional parameters are spelled in this dialect's SQL.
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Dialect::Postgres => PlaceholderStyle::Dollar,
            Dialect::MySql | Dialect::Sqlite => PlaceholderStyle::Question,
        }
    }

    /// Follow-up query reading the id generated by the last insert on the
    /// same connection. `None` when the driver reports it with the result.
    pub fn last_insert_id_query(self) -> Option<&'static str> {
        match self {
            Dialect::MySql => None,
            Dialect::Sqlite => Some("SELECT last_insert_rowid()"),
            Dialect::Postgres => Some("SELECT lastval()"),
        }
    }

    /// Predicate used when a select has no conditions.
    pub fn always_true(self) -> &'static str {
        match self {
            Dialect::Postgres => "TRUE",
            Dialect::MySql | Dialect::Sqlite => "1",
        }
    }

    /// Whether UPDATE/DELETE accept a trailing `LIMIT 1`.
    pub fn single_row_limit(self) -> bool {
        matches!(self, Dialect::MySql)
    }
}

/// How the builder treats the two legacy statement shapes: primary key
/// `'0'` on update, and a multi-value `fields` payload on delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compat {
    /// Refuse both shapes with a configuration error.
    #[default]
    Strict,
    /// Reproduce them: an unconditional UPDATE, and a DELETE without LIMIT.
    Legacy,
}

/// Structured description of one statement.
///
/// Unset members keep their empty defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryArgs {
    pub table: String,
    pub kind: Option<QueryKind>,
    pub selectors: Vec<String>,
    pub conditions: Fields,
    pub fields: Fields,
    pub primary_key: String,
    pub order_by: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub raw: String,
}

impl QueryArgs {
    /// Empty arguments for a `kind` statement on `table`.
    pub fn new(table: impl Into<String>, kind: QueryKind) -> Self {
        Self {
            table: table.into(),
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Build from a textual query type, as found in configuration or CLI input.
    pub fn from_type(table: impl Into<String>, kind: &str) -> BakeResult<Self> {
        Ok(Self::new(table, kind.parse()?))
    }

    /// Columns to select; `*` when left empty.
    pub fn selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    /// Column values the WHERE clause matches against.
    pub fn conditions(mut self, conditions: Fields) -> Self {
        self.conditions = conditions;
        self
    }

    /// Column values written by insert and update.
    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Key column of an update. `"0"` asks for an unconditional update.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Comma-separated `column [ASC|DESC]` items.
    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    /// Page size; adds the `:limit`/`:offset` placeholders.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rows to skip. `-1` turns paging off.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// SQL passed through untouched by a raw query.
    pub fn raw(mut self, sql: impl Into<String>) -> Self {
        self.raw = sql.into();
        self
    }
}

/// Ordering and paging for reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub order_by: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ReadOptions {
    /// No ordering and no paging.
    pub fn new() -> Self {
        Self::default()
    }

    /// Comma-separated `column [ASC|DESC]` items.
    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    /// Page size; adds the `:limit`/`:offset` placeholders.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rows to skip. `-1` turns paging off.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Whether a select built with these options carries `:limit`/`:offset`.
    pub fn pages(&self) -> bool {
        self.limit.is_some() && self.offset != Some(-1)
    }

    /// Values for the paging placeholders.
    pub fn paging_params(&self) -> Fields {
        let mut params = Fields::new();
        if let (true, Some(limit)) = (self.pages(), self.limit) {
            params.insert("limit".into(), limit.into());
            params.insert("offset".into(), self.offset.unwrap_or(0).into());
        }
        params
    }
}

/// An INSERT of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertSpec {
    pub table: String,
    pub fields: Fields,
}

impl InsertSpec {
    /// Insert `fields` into `table`.
    pub fn new(table: impl Into<String>, fields: Fields) -> Self {
        Self {
            table: table.into(),
            fields,
        }
    }
}

impl From<InsertSpec> for QueryArgs {
    fn from(spec: InsertSpec) -> Self {
        QueryArgs::new(spec.table, QueryKind::Insert).fields(spec.fields)
    }
}

/// A SELECT with equality (or LIKE) conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectSpec {
    pub table: String,
    pub selectors: Vec<String>,
    pub conditions: Fields,
    pub options: ReadOptions,
}

impl SelectSpec {
    /// Every row and column of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            selectors: Vec::new(),
            conditions: Fields::new(),
            options: ReadOptions::default(),
        }
    }

    /// Columns to select; `*` when left empty.
    pub fn selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    /// Column values the WHERE clause matches against.
    pub fn conditions(mut self, conditions: Fields) -> Self {
        self.conditions = conditions;
        self
    }

    /// Ordering and paging.
    pub fn options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }
}

impl From<SelectSpec> for QueryArgs {
    fn from(spec: SelectSpec) -> Self {
        QueryArgs {
            selectors: spec.selectors,
            conditions: spec.conditions,
            order_by: spec.options.order_by,
            limit: spec.options.limit,
            offset: spec.options.offset,
            ..QueryArgs::new(spec.table, QueryKind::Select)
        }
    }
}

/// An UPDATE of the row identified by `primary_key`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    pub table: String,
    pub fields: Fields,
    pub primary_key: String,
}

impl UpdateSpec {
    /// Update `fields` of the row whose `primary_key` column matches.
    pub fn new(table: impl Into<String>, fields: Fields, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields,
            primary_key: primary_key.into(),
        }
    }
}

impl From<UpdateSpec> for QueryArgs {
    fn from(spec: UpdateSpec) -> Self {
        QueryArgs::new(spec.table, QueryKind::Update)
            .fields(spec.fields)
            .primary_key(spec.primary_key)
    }
}

/// A DELETE keyed on the first condition.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteSpec {
    pub table: String,
    pub conditions: Fields,
}

impl DeleteSpec {
    /// Delete the row matching the first of `conditions`.
    pub fn new(table: impl Into<String>, conditions: Fields) -> Self {
        Self {
            table: table.into(),
            conditions,
        }
    }
}

impl From<DeleteSpec> for QueryArgs {
    fn from(spec: DeleteSpec) -> Self {
        QueryArgs::new(spec.table, QueryKind::Delete).conditions(spec.conditions)
    }
}

/// Generates SQL text from the armed [`QueryArgs`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    key: Option<QueryArgs>,
    dialect: Dialect,
    compat: Compat,
}

impl QueryBuilder {
    /// An unarmed MySQL builder in strict mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// SQL flavour used for predicates and LIMIT clauses.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Handling of the legacy update and delete shapes.
    pub fn with_compat(mut self, compat: Compat) -> Self {
        self.compat = compat;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn compat(&self) -> Compat {
        self.compat
    }

    /// Arm the builder with `args`, replacing any previous arguments.
    pub fn build_query(&mut self, args: impl Into<QueryArgs>) -> &mut Self {
        self.key = Some(args.into());
        self
    }

    /// Whether `build_query` has been called.
    pub fn is_armed(&self) -> bool {
        self.key.is_some()
    }

    /// `INSERT INTO t (a, b) VALUES (:a, :b)`, columns in payload order.
    pub fn insert_query(&self) -> BakeResult<String> {
        let Some(args) = self.armed_for(QueryKind::Insert)? else {
            return Ok(String::new());
        };
        if args.fields.is_empty() {
            return Ok(String::new());
        }

        let table = table_name(args)?;
        let cols = column_names(&args.fields)?;
        Ok(format!(
            "INSERT INTO {} ({}) VALUES (:{})",
            table,
            cols.join(", "),
            cols.join(", :")
        ))
    }

    /// `SELECT <selectors|*> FROM t WHERE ...` with equality conditions.
    pub fn select_query(&self) -> BakeResult<String> {
        self.select_with("=")
    }

    /// Like [`select_query`](Self::select_query), matching with `LIKE`.
    pub fn search_query(&self) -> BakeResult<String> {
        self.select_with("LIKE")
    }

    /// `UPDATE t SET a = :a, ... WHERE pk = :pk`, skipping the key in SET.
    pub fn update_query(&self) -> BakeResult<String> {
        let Some(args) = self.armed_for(QueryKind::Update)? else {
            return Ok(String::new());
        };
        if args.fields.is_empty() {
            return Ok(String::new());
        }

        let table = table_name(args)?;
        let pk = args.primary_key.as_str();
        let unconditional = pk == "0";
        if unconditional && self.compat == Compat::Strict {
            return Err(BakeError::config(
                "primary key '0' would produce an unconditional UPDATE; \
                 legacy compatibility must be enabled to allow it",
            ));
        }
        if !unconditional {
            if pk.is_empty() {
                return Err(BakeError::config("update requires a primary key column"));
            }
            check_identifier(pk)?;
        }

        let assignments: Vec<String> = column_names(&args.fields)?
            .into_iter()
            .filter(|col| *col != pk)
            .map(|col| format!("{} = :{}", col, col))
            .collect();
        if assignments.is_empty() {
            return Ok(String::new());
        }

        let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
        if !unconditional {
            sql.push_str(&format!(" WHERE {} = :{}", pk, pk));
            if self.dialect.single_row_limit() {
                sql.push_str(" LIMIT 1");
            }
        }
        Ok(sql)
    }

    /// `DELETE FROM t WHERE <first condition> = :<first condition> LIMIT 1`.
    pub fn delete_query(&self) -> BakeResult<String> {
        let Some(args) = self.armed_for(QueryKind::Delete)? else {
            return Ok(String::new());
        };
        let Some(first) = args.conditions.keys().next() else {
            return Ok(String::new());
        };

        let table = table_name(args)?;
        check_identifier(first)?;

        let bulk = args.fields.len() > 1;
        if bulk && self.compat == Compat::Strict {
            return Err(BakeError::config(
                "bulk delete is not supported; legacy compatibility must be enabled \
                 to emit the unbounded single-key DELETE",
            ));
        }

        let mut sql = format!("DELETE FROM {} WHERE {} = :{}", table, first, first);
        if !bulk && self.dialect.single_row_limit() {
            sql.push_str(" LIMIT 1");
        }
        Ok(sql)
    }

    /// The caller-supplied SQL of a raw query.
    pub fn raw_query(&self) -> BakeResult<String> {
        let Some(args) = self.armed_for(QueryKind::Raw)? else {
            return Ok(String::new());
        };
        Ok(args.raw.trim().to_string())
    }

    fn select_with(&self, op: &str) -> BakeResult<String> {
        let Some(args) = self.armed_for(QueryKind::Select)? else {
            return Ok(String::new());
        };

        let table = table_name(args)?;
        let selectors = if args.selectors.is_empty() {
            "*".to_string()
        } else {
            for selector in &args.selectors {
                check_selector(selector)?;
            }
            args.selectors.join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", selectors, table);
        sql.push_str(&self.condition_clause(args, op)?);
        Ok(sql)
    }

    /// WHERE, ORDER BY and paging shared by select and search.
    fn condition_clause(&self, args: &QueryArgs, op: &str) -> BakeResult<String> {
        let mut sql = String::from(" WHERE ");

        if args.conditions.is_empty() {
            sql.push_str(self.dialect.always_true());
        } else {
            let conditions: Vec<String> = column_names(&args.conditions)?
                .into_iter()
                .map(|col| format!("{} {} :{}", col, op, col))
                .collect();
            sql.push_str(&conditions.join(" AND "));
        }

        if let Some(order) = args.order_by.as_deref().map(str::trim).filter(|o| !o.is_empty()) {
            check_order_by(order)?;
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        if args.limit.is_some() && args.offset != Some(-1) {
            sql.push_str(" LIMIT :limit OFFSET :offset");
        }

        Ok(sql)
    }

    /// The armed args if they describe `kind`; `None` on a kind mismatch.
    fn armed_for(&self, kind: QueryKind) -> BakeResult<Option<&QueryArgs>> {
        let args = self.key.as_ref().ok_or_else(|| {
            BakeError::config(format!(
                "{}_query called before build_query; the builder is not armed",
                kind
            ))
        })?;
        Ok((args.kind == Some(kind)).then_some(args))
    }
}

fn table_name(args: &QueryArgs) -> BakeResult<&str> {
    if args.table.is_empty() {
        return Err(BakeError::config("query has no table"));
    }
    for part in args.table.split('.') {
        check_identifier(part)?;
    }
    Ok(&args.table)
}

fn column_names(fields: &Fields) -> BakeResult<Vec<&str>> {
    fields
        .keys()
        .map(|k| check_identifier(k).map(|_| k.as_str()))
        .collect()
}

/// `*`, a column, or a qualified `table.column`.
fn check_selector(selector: &str) -> BakeResult<()> {
    if selector == "*" {
        return Ok(());
    }
    selector.split('.').try_for_each(check_identifier)
}

/// Comma-separated `column [ASC|DESC]` items.
fn check_order_by(order: &str) -> BakeResult<()> {
    for item in order.split(',') {
        let mut words = item.split_whitespace();
        let column = words.next().unwrap_or_default();
        column.split('.').try_for_each(check_identifier)?;
        let direction = words.next();
        let valid = match direction {
            None => true,
            Some(d) => d.eq_ignore_ascii_case("ASC") || d.eq_ignore_ascii_case("DESC"),
        };
        if !valid || words.next().is_some() {
            return Err(BakeError::config(format!("Invalid ORDER BY item: '{}'", item.trim())));
        }
    }
    Ok(())
}

/// Column and parameter names must be plain identifiers.
pub fn check_identifier(name: &str) -> BakeResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(BakeError::config(format!("Invalid identifier: '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn sql_for(args: impl Into<QueryArgs>, f: fn(&QueryBuilder) -> BakeResult<String>) -> String {
        let mut qb = QueryBuilder::new();
        qb.build_query(args);
        f(&qb).unwrap()
    }

    #[test]
    fn test_insert_follows_payload_order() {
        let spec = InsertSpec::new("users", fields(json!({"name": "callum", "email": "c@x.io", "age": 30})));
        assert_eq!(
            sql_for(spec, QueryBuilder::insert_query),
            "INSERT INTO users (name, email, age) VALUES (:name, :email, :age)"
        );
    }

    #[test]
    fn test_insert_empty_fields_is_empty() {
        let spec = InsertSpec::new("users", Fields::new());
        assert_eq!(sql_for(spec, QueryBuilder::insert_query), "");
    }

    #[test]
    fn test_kind_mismatch_is_empty() {
        let spec = InsertSpec::new("users", fields(json!({"name": "x"})));
        assert_eq!(sql_for(spec.clone(), QueryBuilder::select_query), "");
        assert_eq!(sql_for(spec.clone(), QueryBuilder::update_query), "");
        assert_eq!(sql_for(spec, QueryBuilder::delete_query), "");
    }

    #[test]
    fn test_unarmed_builder_is_config_error() {
        let qb = QueryBuilder::new();
        assert!(!qb.is_armed());
        let err = qb.select_query().unwrap_err();
        assert!(err.is_config());
        assert_eq!(
            err.to_string(),
            "Configuration error: select_query called before build_query; the builder is not armed"
        );
    }

    #[test]
    fn test_empty_args_build_without_error() {
        let mut qb = QueryBuilder::new();
        qb.build_query(QueryArgs::default());
        assert_eq!(qb.insert_query().unwrap(), "");
        assert_eq!(qb.select_query().unwrap(), "");
    }

    #[test]
    fn test_unknown_type_string() {
        let err = QueryArgs::from_type("users", "upsert").unwrap_err();
        assert!(err.is_config());
        assert_eq!(QueryArgs::from_type("users", "Select").unwrap().kind, Some(QueryKind::Select));
    }

    #[test]
    fn test_select_all_without_conditions() {
        assert_eq!(
            sql_for(SelectSpec::new("users"), QueryBuilder::select_query),
            "SELECT * FROM users WHERE 1"
        );
    }

    #[test]
    fn test_select_conditions_and_selectors() {
        let spec = SelectSpec::new("users")
            .selectors(["id", "email"])
            .conditions(fields(json!({"status": "active", "role": "admin"})));
        assert_eq!(
            sql_for(spec, QueryBuilder::select_query),
            "SELECT id, email FROM users WHERE status = :status AND role = :role"
        );
    }

    #[test]
    fn test_select_order_and_paging() {
        let spec = SelectSpec::new("users")
            .options(ReadOptions::new().order_by("created_at DESC").limit(10).offset(20));
        assert_eq!(
            sql_for(spec, QueryBuilder::select_query),
            "SELECT * FROM users WHERE 1 ORDER BY created_at DESC LIMIT :limit OFFSET :offset"
        );
    }

    #[test]
    fn test_offset_minus_one_disables_paging() {
        let spec = SelectSpec::new("users").options(ReadOptions::new().limit(10).offset(-1));
        assert_eq!(sql_for(spec, QueryBuilder::select_query), "SELECT * FROM users WHERE 1");
    }

    #[test]
    fn test_blank_order_by_is_ignored() {
        let spec = SelectSpec::new("users").options(ReadOptions::new().order_by("  "));
        assert_eq!(sql_for(spec, QueryBuilder::select_query), "SELECT * FROM users WHERE 1");
    }

    #[test]
    fn test_order_by_accepts_column_lists() {
        let spec = SelectSpec::new("users")
            .selectors(["users.id", "name"])
            .options(ReadOptions::new().order_by("name desc, users.id"));
        assert_eq!(
            sql_for(spec, QueryBuilder::select_query),
            "SELECT users.id, name FROM users WHERE 1 ORDER BY name desc, users.id"
        );
    }

    #[test]
    fn test_selectors_and_order_by_reject_sql() {
        let mut qb = QueryBuilder::new();
        qb.build_query(SelectSpec::new("users").selectors(["id; DROP TABLE users"]));
        assert!(qb.select_query().unwrap_err().is_config());

        qb.build_query(SelectSpec::new("users").selectors(["id", "1=1 --"]));
        assert!(qb.search_query().unwrap_err().is_config());

        for order in ["id; DROP TABLE users", "id DESC LIMIT 1", "id,,name", "(SELECT 1)"] {
            qb.build_query(SelectSpec::new("users").options(ReadOptions::new().order_by(order)));
            assert!(qb.select_query().unwrap_err().is_config(), "{}", order);
        }
    }

    #[test]
    fn test_search_uses_like() {
        let spec = SelectSpec::new("users").conditions(fields(json!({"name": "cal"})));
        assert_eq!(
            sql_for(spec, QueryBuilder::search_query),
            "SELECT * FROM users WHERE name LIKE :name"
        );
        assert_eq!(
            sql_for(SelectSpec::new("users"), QueryBuilder::search_query),
            "SELECT * FROM users WHERE 1"
        );
    }

    #[test]
    fn test_update_skips_primary_key() {
        let spec = UpdateSpec::new(
            "users",
            fields(json!({"id": 4, "name": "callum", "email": "c@x.io"})),
            "id",
        );
        assert_eq!(
            sql_for(spec, QueryBuilder::update_query),
            "UPDATE users SET name = :name, email = :email WHERE id = :id LIMIT 1"
        );
    }

    #[test]
    fn test_update_without_primary_key_column_is_error() {
        let mut qb = QueryBuilder::new();
        qb.build_query(UpdateSpec::new("users", fields(json!({"name": "x"})), ""));
        assert!(qb.update_query().unwrap_err().is_config());
    }

    #[test]
    fn test_update_zero_key_refused_when_strict() {
        let mut qb = QueryBuilder::new();
        qb.build_query(UpdateSpec::new("users", fields(json!({"active": 0})), "0"));
        assert!(qb.update_query().unwrap_err().is_config());
    }

    // Legacy behaviour kept verbatim: primary key '0' drops the WHERE clause
    // and updates every row of the table.
    #[test]
    fn test_update_zero_key_is_unconditional_in_legacy_mode() {
        let mut qb = QueryBuilder::new().with_compat(Compat::Legacy);
        qb.build_query(UpdateSpec::new("users", fields(json!({"active": 0, "role": "x"})), "0"));
        assert_eq!(
            qb.update_query().unwrap(),
            "UPDATE users SET active = :active, role = :role"
        );
    }

    #[test]
    fn test_delete_uses_first_condition() {
        let spec = DeleteSpec::new("users", fields(json!({"id": 3, "email": "x"})));
        assert_eq!(
            sql_for(spec, QueryBuilder::delete_query),
            "DELETE FROM users WHERE id = :id LIMIT 1"
        );
    }

    #[test]
    fn test_delete_without_conditions_is_empty() {
        let spec = DeleteSpec::new("users", Fields::new());
        assert_eq!(sql_for(spec, QueryBuilder::delete_query), "");
    }

    #[test]
    fn test_bulk_delete_placeholder() {
        let args = QueryArgs::new("users", QueryKind::Delete)
            .conditions(fields(json!({"id": 1})))
            .fields(fields(json!({"a": 1, "b": 2, "c": 3})));

        let mut strict = QueryBuilder::new();
        strict.build_query(args.clone());
        assert!(strict.delete_query().unwrap_err().is_config());

        // A single statement without LIMIT, not one statement per value.
        let mut legacy = QueryBuilder::new().with_compat(Compat::Legacy);
        legacy.build_query(args);
        assert_eq!(legacy.delete_query().unwrap(), "DELETE FROM users WHERE id = :id");
    }

    #[test]
    fn test_sqlite_dialect() {
        let mut qb = QueryBuilder::new().with_dialect(Dialect::Sqlite);
        qb.build_query(UpdateSpec::new("users", fields(json!({"id": 1, "name": "x"})), "id"));
        assert_eq!(qb.update_query().unwrap(), "UPDATE users SET name = :name WHERE id = :id");

        qb.build_query(DeleteSpec::new("users", fields(json!({"id": 1}))));
        assert_eq!(qb.delete_query().unwrap(), "DELETE FROM users WHERE id = :id");
    }

    #[test]
    fn test_postgres_always_true() {
        let mut qb = QueryBuilder::new().with_dialect(Dialect::Postgres);
        qb.build_query(SelectSpec::new("users"));
        assert_eq!(qb.select_query().unwrap(), "SELECT * FROM users WHERE TRUE");
    }

    #[test]
    fn test_raw_passthrough() {
        let mut qb = QueryBuilder::new();
        qb.build_query(QueryArgs::new("", QueryKind::Raw).raw(" SELECT 1 "));
        assert_eq!(qb.raw_query().unwrap(), "SELECT 1");
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        let mut qb = QueryBuilder::new();
        qb.build_query(InsertSpec::new("users", fields(json!({"name; DROP TABLE users": 1}))));
        assert!(qb.insert_query().unwrap_err().is_config());

        qb.build_query(SelectSpec::new("users u"));
        assert!(qb.select_query().unwrap_err().is_config());

        qb.build_query(SelectSpec::new("app.users"));
        assert_eq!(qb.select_query().unwrap(), "SELECT * FROM app.users WHERE 1");
    }

    #[test]
    fn test_last_insert_id_query_per_dialect() {
        assert_eq!(Dialect::MySql.last_insert_id_query(), None);
        assert_eq!(Dialect::Sqlite.last_insert_id_query(), Some("SELECT last_insert_rowid()"));
        assert_eq!(Dialect::Postgres.last_insert_id_query(), Some("SELECT lastval()"));
    }

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::from_url("postgres://localhost/db").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("mysql://localhost/db").unwrap(), Dialect::MySql);
        assert!(matches!(
            Dialect::from_url("oracle://x"),
            Err(BakeError::Construction { .. })
        ));
    }

    #[test]
    fn test_paging_params() {
        let params = ReadOptions::new().limit(5).paging_params();
        assert_eq!(params.get("limit"), Some(&json!(5)));
        assert_eq!(params.get("offset"), Some(&json!(0)));
        assert!(ReadOptions::new().limit(5).offset(-1).paging_params().is_empty());
    }
}
