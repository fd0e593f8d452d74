pub mod executor;
pub mod models;
pub mod pool;
pub mod schema;

pub use executor::{DbExecutor, DieselSqliteExecutor};
pub use pool::{init_db_pool, init_test_pool, DbPool};
