pub mod analyze;
pub mod create_project;
pub mod create_workflow;
pub mod list_steps;
pub mod list_triggers;
pub mod login;
pub mod new_project;
pub mod open;
pub mod quick_test;
pub mod utils;
pub mod version;

#[cfg(test)]
#[path = "../commands_test.rs"]
mod commands_test;
