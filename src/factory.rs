//! Wiring: configuration in, ready-to-use repositories out.
//!
//! ```no_run
//! # async fn demo() -> bakeorm::BakeResult<()> {
//! use bakeorm::{BakeConfig, BakeManager};
//!
//! let config = BakeConfig::load(None)?;
//! let mut users = BakeManager::new(config, "users", "id").repository()?;
//! let user = users.find(1).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::{BakeConfig, DatabaseConfig};
use crate::connection::{ConnectionProvider, DbConnection};
use crate::crud::{Crud, TableSchema};
use crate::data_mapper::DataMapper;
use crate::entity_manager::EntityManager;
use crate::error::{BakeError, BakeResult};
use crate::query_builder::{Compat, Dialect, QueryBuilder};
use crate::repository::DataRepository;

/// Builds a [`DataMapper`] for the configured default driver.
pub struct DataMapperFactory;

impl DataMapperFactory {
    pub fn create(config: &DatabaseConfig) -> BakeResult<DataMapper> {
        Self::create_for(config, &config.driver)
    }

    /// Data mapper for a named driver rather than the default one.
    pub fn create_for(config: &DatabaseConfig, driver: &str) -> BakeResult<DataMapper> {
        let credentials = config.credentials(driver)?.clone();
        let connection = DbConnection::new(credentials)?;
        tracing::debug!(driver, "data mapper created");
        Ok(DataMapper::new(connection))
    }
}

pub struct QueryBuilderFactory;

impl QueryBuilderFactory {
    pub fn create(dialect: Dialect, compat: Compat) -> QueryBuilder {
        QueryBuilder::new().with_dialect(dialect).with_compat(compat)
    }
}

/// Binds a data mapper and a query builder to one table.
pub struct EntityManagerFactory {
    data_mapper: DataMapper,
    query_builder: QueryBuilder,
}

impl EntityManagerFactory {
    pub fn new(data_mapper: DataMapper, query_builder: QueryBuilder) -> Self {
        Self {
            data_mapper,
            query_builder,
        }
    }

    pub fn create(self, table: &str, primary_key: &str) -> BakeResult<EntityManager> {
        let schema = TableSchema::new(table, primary_key)
            .map_err(|e| BakeError::construction(table, e.to_string()))?;
        let crud = Crud::new(self.data_mapper, self.query_builder, schema);
        Ok(EntityManager::new(crud))
    }
}

pub struct DataRepositoryFactory;

impl DataRepositoryFactory {
    pub fn create(em: EntityManager) -> DataRepository {
        DataRepository::new(em)
    }
}

/// One-stop construction of the whole chain for a table.
#[derive(Debug, Clone)]
pub struct BakeManager {
    config: BakeConfig,
    table: String,
    primary_key: String,
}

impl BakeManager {
    pub fn new(config: BakeConfig, table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            config,
            table: table.into(),
            primary_key: primary_key.into(),
        }
    }

    pub fn config(&self) -> &BakeConfig {
        &self.config
    }

    /// Build the entity manager. No connection is opened until first use.
    pub fn init(&self) -> BakeResult<EntityManager> {
        let data_mapper = DataMapperFactory::create(&self.config.database)?;
        let dialect = data_mapper.connection().dialect();
        let query_builder = QueryBuilderFactory::create(dialect, self.config.compat());

        tracing::info!(
            table = %self.table,
            driver = %self.config.database.driver,
            ?dialect,
            "entity manager ready"
        );
        EntityManagerFactory::new(data_mapper, query_builder).create(&self.table, &self.primary_key)
    }

    pub fn repository(&self) -> BakeResult<DataRepository> {
        Ok(DataRepositoryFactory::create(self.init()?))
    }
}
