pub mod dashboard;
pub mod feed;
pub mod logging;
pub mod preferences;
pub mod settings;
