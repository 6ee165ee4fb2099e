pub mod migrate;
pub mod profile;
