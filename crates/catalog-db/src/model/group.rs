use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::schema;

/// A mirrored provider group. The id is the provider's own group id.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Queryable, Selectable, Identifiable, Serialize,
)]
#[diesel(table_name = schema::keycloak_group)]
#[diesel(check_for_backend(Pg))]
pub struct Group {
    pub id: String,
    pub name: String,
    pub path: String,
    pub parent_id: Option<String>,
    pub last_sync_time: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = schema::keycloak_group)]
#[diesel(treat_none_as_null = true)]
pub struct NewGroup<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub path: &'a str,
    pub parent_id: Option<&'a str>,
    pub last_sync_time: chrono::DateTime<chrono::Utc>,
}

impl NewGroup<'_> {
    /// True when writing this row would change `existing` beyond its sync time.
    #[must_use]
    pub fn differs_from(&self, existing: &Group) -> bool {
        self.name != existing.name
            || self.path != existing.path
            || self.parent_id != existing.parent_id.as_deref()
    }
}

/// A group together with the names of its attached roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupWithRoles {
    #[serde(flatten)]
    pub group: Group,
    pub roles: Vec<String>,
}
