use std::collections::VecDeque;

use catalog_db::model::sync::{DesiredGroup, SyncPlan};
use catalog_keycloak::RemoteGroup;

/// ## Summary
/// Flattens a group forest breadth first into `(parent_id, group)` pairs.
///
/// Roots come first with no parent; every group is preceded by its parent.
/// The returned groups have their `sub_groups` moved out.
#[must_use]
pub fn flatten_group_tree(roots: Vec<RemoteGroup>) -> Vec<(Option<String>, RemoteGroup)> {
    let mut flat = Vec::new();
    let mut queue: VecDeque<(Option<String>, Vec<RemoteGroup>)> = VecDeque::new();
    queue.push_back((None, roots));

    while let Some((parent_id, children)) = queue.pop_front() {
        for mut group in children {
            let sub_groups = std::mem::take(&mut group.sub_groups);
            if !sub_groups.is_empty() {
                queue.push_back((Some(group.id.clone()), sub_groups));
            }
            flat.push((parent_id.clone(), group));
        }
    }
    flat
}

/// ## Summary
/// Builds the desired mirror state from flattened groups.
///
/// Each group keeps only the roles it holds for `client_id`.
#[must_use]
pub fn build_plan(
    flat: Vec<(Option<String>, RemoteGroup)>,
    client_id: &str,
    mut plan: SyncPlan,
) -> SyncPlan {
    plan.groups = flat
        .into_iter()
        .map(|(parent_id, mut group)| DesiredGroup {
            role_names: group
                .client_roles
                .remove(client_id)
                .unwrap_or_default()
                .into_iter()
                .collect(),
            id: group.id,
            name: group.name,
            path: group.path,
            parent_id,
        })
        .collect();
    plan
}
