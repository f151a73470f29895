use std::collections::BTreeMap;

use async_trait::async_trait;
use catalog_core::constants::GROUP_SYNC_LOCK_NAME;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use super::{GroupMirror, MirrorTx, reconcile};
use crate::db::connection::DbPool;
use crate::db::schema::{keycloak_group, keycloak_group_role, keycloak_role};
use crate::error::{DbError, DbResult};
use crate::model::group::{Group, GroupWithRoles};
use crate::model::group_role::NewGroupRole;
use crate::model::role::{NewRole, Role};
use crate::model::sync::{DesiredGroup, SyncPlan, SyncSummary, UpsertOutcome};

/// Group mirror stored in Postgres.
#[derive(Clone)]
pub struct PgMirror {
    pool: DbPool,
}

impl PgMirror {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

struct PgTx<'c> {
    conn: &'c mut AsyncPgConnection,
}

#[async_trait]
impl MirrorTx for PgTx<'_> {
    async fn upsert_group(
        &mut self,
        group: &DesiredGroup,
        sync_time: DateTime<Utc>,
    ) -> DbResult<UpsertOutcome> {
        let row = group.as_row(sync_time);
        let existing: Option<Group> = keycloak_group::table
            .find(group.id.as_str())
            .select(Group::as_select())
            .first(self.conn)
            .await
            .optional()?;

        let outcome = match existing {
            None => {
                diesel::insert_into(keycloak_group::table)
                    .values(&row)
                    .execute(self.conn)
                    .await?;
                UpsertOutcome::Created
            }
            Some(existing) => {
                let outcome = if row.differs_from(&existing) {
                    UpsertOutcome::Updated
                } else {
                    UpsertOutcome::Unchanged
                };
                diesel::update(keycloak_group::table.find(group.id.as_str()))
                    .set(&row)
                    .execute(self.conn)
                    .await?;
                outcome
            }
        };
        Ok(outcome)
    }

    async fn group_roles(&mut self, group_id: &str) -> DbResult<Vec<Role>> {
        let roles = keycloak_group_role::table
            .inner_join(keycloak_role::table)
            .filter(keycloak_group_role::group_id.eq(group_id))
            .select(Role::as_select())
            .load(self.conn)
            .await?;
        Ok(roles)
    }

    async fn get_or_create_role(&mut self, name: &str) -> DbResult<Role> {
        diesel::insert_into(keycloak_role::table)
            .values(NewRole::new(name))
            .on_conflict(keycloak_role::name)
            .do_nothing()
            .execute(self.conn)
            .await?;
        let role = keycloak_role::table
            .filter(keycloak_role::name.eq(name))
            .select(Role::as_select())
            .first(self.conn)
            .await?;
        Ok(role)
    }

    async fn attach_role(&mut self, group_id: &str, role_id: uuid::Uuid) -> DbResult<()> {
        diesel::insert_into(keycloak_group_role::table)
            .values(NewGroupRole { group_id, role_id })
            .on_conflict_do_nothing()
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn detach_role(&mut self, group_id: &str, role_id: uuid::Uuid) -> DbResult<()> {
        diesel::delete(
            keycloak_group_role::table
                .filter(keycloak_group_role::group_id.eq(group_id))
                .filter(keycloak_group_role::role_id.eq(role_id)),
        )
        .execute(self.conn)
        .await?;
        Ok(())
    }

    async fn delete_stale_groups(&mut self, sync_time: DateTime<Utc>) -> DbResult<usize> {
        let deleted = diesel::delete(
            keycloak_group::table.filter(keycloak_group::last_sync_time.ne(sync_time)),
        )
        .execute(self.conn)
        .await?;
        Ok(deleted)
    }
}

#[async_trait]
impl GroupMirror for PgMirror {
    #[tracing::instrument(skip(self, plan), fields(groups = plan.groups.len(), sync_time = %plan.sync_time))]
    async fn apply_sync(&self, plan: &SyncPlan) -> DbResult<SyncSummary> {
        let mut conn = self.pool.get().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, DbError, _>(|conn| {
            async move {
                // Concurrent runs from other processes queue here until we commit.
                diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
                    .bind::<Text, _>(GROUP_SYNC_LOCK_NAME)
                    .execute(conn)
                    .await?;
                let mut tx = PgTx { conn };
                reconcile(&mut tx, plan).await
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn list_groups(&self) -> DbResult<Vec<GroupWithRoles>> {
        let mut conn = self.pool.get().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        // Groups and their role links must come from the same snapshot.
        let (groups, links) = conn
            .build_transaction()
            .read_only()
            .repeatable_read()
            .run::<_, DbError, _>(|conn| {
                async move {
                    let groups: Vec<Group> = keycloak_group::table
                        .order(keycloak_group::path.asc())
                        .select(Group::as_select())
                        .load(conn)
                        .await?;
                    let links: Vec<(String, String)> = keycloak_group_role::table
                        .inner_join(keycloak_role::table)
                        .select((keycloak_group_role::group_id, keycloak_role::name))
                        .order(keycloak_role::name.asc())
                        .load(conn)
                        .await?;
                    Ok((groups, links))
                }
                .scope_boxed()
            })
            .await?;

        let mut roles_by_group: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (group_id, role) in links {
            roles_by_group.entry(group_id).or_default().push(role);
        }

        Ok(groups
            .into_iter()
            .map(|group| {
                let roles = roles_by_group.remove(&group.id).unwrap_or_default();
                GroupWithRoles { group, roles }
            })
            .collect())
    }

    #[tracing::instrument(skip(self), fields(count = ids.len()))]
    async fn groups_by_ids(&self, ids: &[String]) -> DbResult<Vec<Group>> {
        let mut conn = self.pool.get().await?;
        let groups = keycloak_group::table
            .filter(keycloak_group::id.eq_any(ids.iter().map(String::as_str)))
            .order(keycloak_group::path.asc())
            .select(Group::as_select())
            .load(&mut conn)
            .await?;
        Ok(groups)
    }
}
