pub mod config_map;
pub mod pod;
pub mod secret;
