pub mod fixture;
pub mod http_csv;
