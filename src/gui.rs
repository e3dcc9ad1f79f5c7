pub mod config_window;
pub mod main_window;
pub mod popups;
