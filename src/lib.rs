//! # BakeORM
//!
//! A small data-access core: build SQL from structured arguments, bind
//! named parameters safely, run it through one owned connection, and
//! expose per-table CRUD plus repository-style finders.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use bakeorm::prelude::*;
//! use serde_json::json;
//!
//! let config = BakeConfig::builder().database_url("sqlite://app.db").build();
//! let mut users = BakeManager::new(config, "users", "id").repository()?;
//!
//! let admins = users
//!     .find_by(&[], &json!({"role": "admin"}), &Fields::new(), &ReadOptions::new().limit(10))
//!     .await?;
//! let first = users.find(1).await?;
//! ```
//!
//! ## Layers
//!
//! | Layer              | Role                                        |
//! |--------------------|---------------------------------------------|
//! | [`QueryBuilder`]   | Structured arguments to SQL text            |
//! | [`DataMapper`]     | Prepare, bind `:name` params, execute       |
//! | [`Crud`]           | Per-table create/read/update/delete/search  |
//! | [`EntityManager`]  | Holds one table's CRUD object               |
//! | [`DataRepository`] | Finders: by id, by conditions, paged search |

pub mod config;
pub mod connection;
pub mod crud;
pub mod data_mapper;
pub mod entity_manager;
pub mod error;
pub mod factory;
pub mod placeholder;
pub mod query_builder;
pub mod repository;
pub mod value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::BakeConfig;
pub use crud::{Crud, CrudOps, TableSchema};
pub use data_mapper::DataMapper;
pub use entity_manager::EntityManager;
pub use error::{BakeError, BakeResult};
pub use factory::BakeManager;
pub use query_builder::QueryBuilder;
pub use repository::DataRepository;

pub mod prelude {
    pub use crate::config::{BakeConfig, DatabaseConfig, OrmConfig};
    pub use crate::connection::{ConnectionProvider, Credentials, DbConnection};
    pub use crate::crud::{Crud, CrudOps, TableSchema};
    pub use crate::data_mapper::DataMapper;
    pub use crate::entity_manager::EntityManager;
    pub use crate::error::*;
    pub use crate::factory::{
        BakeManager, DataMapperFactory, DataRepositoryFactory, EntityManagerFactory,
        QueryBuilderFactory,
    };
    pub use crate::query_builder::{
        Compat, DeleteSpec, Dialect, InsertSpec, QueryArgs, QueryBuilder, QueryKind, ReadOptions,
        SelectSpec, UpdateSpec,
    };
    pub use crate::repository::{DataRepository, Paging};
    pub use crate::value::{Fields, ResultRow, SqlValue};
}
