//! Visibility filters and the capabilities an entity needs to be filtered.
//!
//! Only types implementing both [`HasOwner`] and [`HasDepartmentAndStations`]
//! can be passed to a filter. A type without them is rejected at compile time
//! instead of being returned unfiltered:
//!
//! ```compile_fail
//! use approval_service::visibility::VisibilityFilter;
//!
//! struct AuditNote {
//!     body: String,
//! }
//!
//! let note = AuditNote { body: "unscoped".to_string() };
//! VisibilityFilter::Unrestricted.matches(&note);
//! ```

use sqlx::{Postgres, QueryBuilder};

use super::normalize::{department_sql, normalize_department, normalize_station, station_sql};
use super::scope::VisibilityScope;
use crate::models::Person;

/// Entity owned by a single person.
pub trait HasOwner {
    fn owner_id(&self) -> &str;
}

/// Entity located in a department at one or more stations.
///
/// Requisitions report both issue and delivery stations; a station match on
/// either is enough.
pub trait HasDepartmentAndStations {
    fn department_id(&self) -> &str;
    fn station_ids(&self) -> Vec<&str>;
}

/// Column names backing the scoping capabilities of a table.
#[derive(Debug, Clone, Copy)]
pub struct ScopeColumns {
    pub owner: &'static str,
    pub department: &'static str,
    pub stations: &'static [&'static str],
}

/// A predicate derived from a person's scope. Department and station values are
/// stored already normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityFilter {
    DenyAll,
    Owner(String),
    DepartmentAtStation { department: String, station: String },
    Department(String),
    Station(String),
    Unrestricted,
}

impl VisibilityFilter {
    pub fn for_person(scope: VisibilityScope, person: &Person) -> Self {
        let department = normalize_department(&person.department_id);
        let station = normalize_station(&person.station_id);
        match scope {
            VisibilityScope::PersonalOnly => Self::Owner(person.payroll_no.clone()),
            VisibilityScope::DepartmentAtStation => Self::DepartmentAtStation {
                department,
                station,
            },
            VisibilityScope::CrossStation => Self::Department(department),
            VisibilityScope::CrossDepartment => Self::Station(station),
            VisibilityScope::Unrestricted => Self::Unrestricted,
        }
    }

    pub fn matches<E>(&self, entity: &E) -> bool
    where
        E: HasOwner + HasDepartmentAndStations + ?Sized,
    {
        match self {
            Self::DenyAll => false,
            Self::Owner(payroll_no) => entity.owner_id() == payroll_no,
            Self::DepartmentAtStation {
                department,
                station,
            } => department_matches(entity, department) && station_matches(entity, station),
            Self::Department(department) => department_matches(entity, department),
            Self::Station(station) => station_matches(entity, station),
            Self::Unrestricted => true,
        }
    }

    /// Apply the filter to an in-memory query.
    pub fn apply<E, I>(&self, query: I) -> Vec<E>
    where
        I: IntoIterator<Item = E>,
        E: HasOwner + HasDepartmentAndStations,
    {
        query.into_iter().filter(|e| self.matches(e)).collect()
    }

    /// Append the filter as a `WHERE` clause. Must be called before any
    /// `ORDER BY`/`LIMIT` is pushed.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>, columns: &ScopeColumns) {
        match self {
            Self::Unrestricted => {}
            Self::DenyAll => {
                qb.push(" WHERE FALSE");
            }
            Self::Owner(payroll_no) => {
                qb.push(" WHERE ")
                    .push(columns.owner)
                    .push(" = ")
                    .push_bind(payroll_no.clone());
            }
            Self::DepartmentAtStation {
                department,
                station,
            } => {
                qb.push(" WHERE ");
                push_department(qb, columns, department);
                qb.push(" AND ");
                push_station(qb, columns, station);
            }
            Self::Department(department) => {
                qb.push(" WHERE ");
                push_department(qb, columns, department);
            }
            Self::Station(station) => {
                qb.push(" WHERE ");
                push_station(qb, columns, station);
            }
        }
    }
}

fn department_matches<E: HasDepartmentAndStations + ?Sized>(entity: &E, department: &str) -> bool {
    normalize_department(entity.department_id()) == department
}

fn station_matches<E: HasDepartmentAndStations + ?Sized>(entity: &E, station: &str) -> bool {
    entity
        .station_ids()
        .into_iter()
        .any(|s| normalize_station(s) == station)
}

fn push_department(qb: &mut QueryBuilder<'_, Postgres>, columns: &ScopeColumns, department: &str) {
    qb.push(department_sql(columns.department))
        .push(" = ")
        .push_bind(department.to_string());
}

fn push_station(qb: &mut QueryBuilder<'_, Postgres>, columns: &ScopeColumns, station: &str) {
    if columns.stations.is_empty() {
        qb.push("FALSE");
        return;
    }
    qb.push("(");
    for (i, column) in columns.stations.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(station_sql(column))
            .push(" = ")
            .push_bind(station.to_string());
    }
    qb.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        owner: &'static str,
        department: &'static str,
        stations: Vec<&'static str>,
    }

    impl HasOwner for Row {
        fn owner_id(&self) -> &str {
            self.owner
        }
    }

    impl HasDepartmentAndStations for Row {
        fn department_id(&self) -> &str {
            self.department
        }
        fn station_ids(&self) -> Vec<&str> {
            self.stations.clone()
        }
    }

    const COLUMNS: ScopeColumns = ScopeColumns {
        owner: "payroll_no",
        department: "department_id",
        stations: &["issue_station_id", "delivery_station_id"],
    };

    fn person() -> Person {
        Person::new("100", "Ann", " ICT ", "5", "User")
    }

    #[test]
    fn station_match_uses_either_station_and_normalises() {
        let filter = VisibilityFilter::for_person(VisibilityScope::CrossDepartment, &person());
        assert_eq!(filter, VisibilityFilter::Station("005".to_string()));

        let delivery_side = Row {
            owner: "9",
            department: "FIN",
            stations: vec!["HQ", "005"],
        };
        let issue_side = Row {
            owner: "9",
            department: "FIN",
            stations: vec!["05", "HQ"],
        };
        let neither = Row {
            owner: "9",
            department: "FIN",
            stations: vec!["HQ", "006"],
        };
        assert!(filter.matches(&delivery_side));
        assert!(filter.matches(&issue_side));
        assert!(!filter.matches(&neither));
    }

    #[test]
    fn department_comparison_trims() {
        let filter = VisibilityFilter::for_person(VisibilityScope::CrossStation, &person());
        let row = Row {
            owner: "9",
            department: "ICT  ",
            stations: vec!["777"],
        };
        assert!(filter.matches(&row));
    }

    #[test]
    fn deny_all_matches_nothing() {
        let row = Row {
            owner: "100",
            department: "ICT",
            stations: vec!["005"],
        };
        assert!(!VisibilityFilter::DenyAll.matches(&row));
        assert!(VisibilityFilter::Unrestricted.matches(&row));
    }

    #[test]
    fn owner_filter_renders_single_bind() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM requisitions");
        VisibilityFilter::Owner("100".to_string()).push_where(&mut qb, &COLUMNS);
        assert_eq!(qb.sql(), "SELECT * FROM requisitions WHERE payroll_no = $1");
    }

    #[test]
    fn department_at_station_renders_both_station_columns() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM requisitions");
        VisibilityFilter::DepartmentAtStation {
            department: "ICT".to_string(),
            station: "005".to_string(),
        }
        .push_where(&mut qb, &COLUMNS);
        let sql = qb.sql();
        assert!(sql.contains(&format!(" WHERE {} = $1 AND (", department_sql("department_id"))));
        assert!(sql.contains(&format!("{} = $2", station_sql("issue_station_id"))));
        assert!(sql.contains(&format!(" OR {} = $3)", station_sql("delivery_station_id"))));
    }

    #[test]
    fn unrestricted_and_deny_all_render() {
        let mut open = QueryBuilder::<Postgres>::new("SELECT 1");
        VisibilityFilter::Unrestricted.push_where(&mut open, &COLUMNS);
        assert_eq!(open.sql(), "SELECT 1");

        let mut closed = QueryBuilder::<Postgres>::new("SELECT 1");
        VisibilityFilter::DenyAll.push_where(&mut closed, &COLUMNS);
        assert_eq!(closed.sql(), "SELECT 1 WHERE FALSE");
    }
}
