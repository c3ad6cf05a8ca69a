pub mod analyze;
pub mod files;
pub mod health;
pub mod history;
