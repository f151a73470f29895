use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::schema;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Queryable, Selectable, Identifiable, Serialize,
)]
#[diesel(table_name = schema::keycloak_role)]
#[diesel(check_for_backend(Pg))]
pub struct Role {
    pub id: uuid::Uuid,
    pub name: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::keycloak_role)]
pub struct NewRole<'a> {
    pub id: uuid::Uuid,
    pub name: &'a str,
}

impl<'a> NewRole<'a> {
    #[must_use]
    pub fn new(name: &'a str) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            name,
        }
    }
}
