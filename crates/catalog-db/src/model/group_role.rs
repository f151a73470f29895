use crate::db::schema;
use diesel::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Insertable)]
#[diesel(table_name = schema::keycloak_group_role)]
pub struct NewGroupRole<'a> {
    pub group_id: &'a str,
    pub role_id: uuid::Uuid,
}
