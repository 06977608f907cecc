pub mod anomaly;
pub mod bus;
pub mod dashboard;
pub mod db;
pub mod decode;
pub mod error;
pub mod ingest;
pub mod live;
pub mod models;
pub mod settings;
