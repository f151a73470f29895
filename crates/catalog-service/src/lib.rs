pub mod authz;
pub mod error;
pub mod sync;

#[cfg(test)]
mod stubs;
