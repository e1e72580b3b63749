pub mod api;
pub mod category;
pub mod ingest;
pub mod logging;

pub mod util {
    pub mod db;
    pub mod env;
}
