/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_VERSION_COMPONENT: &str = "v1";
pub const API_ROUTE_PREFIX: &str =
    const_str::concat!("/", API_ROUTE_COMPONENT, "/", API_VERSION_COMPONENT);

pub const GROUPS_ROUTE_COMPONENT: &str = "groups";
pub const GROUPS_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", GROUPS_ROUTE_COMPONENT);

pub const GROUP_SYNC_ROUTE_COMPONENT: &str = "sync";
pub const GROUP_SYNC_ROUTE: &str =
    const_str::concat!(GROUPS_ROUTE_PREFIX, "/", GROUP_SYNC_ROUTE_COMPONENT);

/// Reserved object id naming "every object of this type".
pub const WILDCARD_RESOURCE_ID: &str = "all";

/// Separator between type and id (or type and permission) in remote names.
pub const NAME_SEPARATOR: char = ':';

/// Separator between resource and scope in encoded permission strings.
pub const PERMISSION_SEPARATOR: char = '#';

/// Key for the advisory lock serializing group sync runs.
pub const GROUP_SYNC_LOCK_NAME: &str = "group-sync";
