pub mod control;
pub mod preferences;
pub mod views;
