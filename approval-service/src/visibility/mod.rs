//! Visibility scoping: who may read which requisitions and approvals.

pub mod filter;
pub mod normalize;
pub mod scope;

pub use filter::{HasDepartmentAndStations, HasOwner, ScopeColumns, VisibilityFilter};
pub use normalize::{
    HQ_STATION, department_sql, is_hq_station, normalize_department, normalize_station, station_sql,
    trim_id, trim_sql,
};
pub use scope::{ADMIN_ROLE, ScopeResolver, VisibilityScope, compute_scope};
