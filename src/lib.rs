pub mod attendance;
pub mod auth;
pub mod constants;
pub mod crew;
pub mod data_backend;
pub mod data_types;
pub mod db_operations;
pub mod dietary;
pub mod errors;
pub mod extraction;
pub mod menus;
pub mod requests;
pub mod shared_main;
pub mod waste;
