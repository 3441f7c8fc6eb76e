pub mod ddl;
pub mod migrate;
