pub mod group;
pub mod group_role;
pub mod role;
pub mod sync;
