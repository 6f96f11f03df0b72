pub mod aggregator;
pub mod analyzers;
pub mod config;
pub mod error;
pub mod exchange;
pub mod filters;
pub mod models;
pub mod risk;
#[cfg(test)]
pub mod test_helpers;
pub mod trading;
