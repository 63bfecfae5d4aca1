pub mod history;
pub mod lots;
pub mod setup;
pub mod summary;
pub mod ui;
pub mod watch;
