pub mod broadcaster;
pub mod fetcher;
pub mod handlers;
pub mod models;
pub mod poller;
pub mod port;
pub mod registry;
pub mod routes;
pub mod server;
pub mod service;
pub mod websocket;
