#[path = "../common/mod.rs"]
mod common;

mod registry;
mod router;
