pub mod filter_spec;
pub mod metric;
pub mod reference;
pub mod season;
pub mod weather_record;
