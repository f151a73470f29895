pub mod db;
pub mod error;
pub mod mirror;
pub mod model;
