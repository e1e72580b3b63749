// HTTP layer: login, dashboard, category pages and workbook uploads

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod session;

pub use server::ApiServer;
