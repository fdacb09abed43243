pub mod filter;
pub mod geo;
pub mod rank;
pub mod record;
pub mod services;
pub mod store;

pub use filter::{CompiledFilter, DateRange, FilterConfig, NumericRange};
pub use geo::{find_near, in_cell, latest_in_cell, GeoQuery, Nearby};
pub use rank::{aggregate, summary, top_n, MetricSummary};
pub use record::{Page, PageResult, Queryable, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use services::*;
pub use store::{Collection, Store};
