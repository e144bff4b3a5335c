pub mod config_cmd;
pub mod providers;
pub mod serve;
pub mod test_provider;
pub mod tools;
