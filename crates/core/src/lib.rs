mod assembler;
mod catalog;
mod collation;
mod error;
mod model;
mod normalize;
mod planner;
mod pool;
pub mod schema;

pub use assembler::{hydrate, lookup_by_term};
pub use catalog::GlossaryCatalog;
pub use collation::{Collation, SQL_COLLATION};
pub use error::{GlossaryError, Result};
pub use model::{CourseEntry, GlossaryDocument, GlossaryPage};
pub use normalize::{map_glossary_row, normalize, RawAggregate};
pub use planner::{
    parse_leading_int, FilterPlan, GlossaryFilter, Pagination, DEFAULT_LIMIT, DEFAULT_PAGE,
    MAX_LIMIT,
};
pub use pool::{
    ConnectionPool, ConnectionSource, PoolOptions, PooledConnection, DEFAULT_ACQUIRE_TIMEOUT,
    DEFAULT_BUSY_TIMEOUT, DEFAULT_MAX_CONNECTIONS,
};
