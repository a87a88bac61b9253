pub mod accounts;
pub mod app;
pub mod cards;
pub mod config;
pub mod providers;
pub mod routes;
pub mod session;
pub mod snippets;
pub mod state;
pub mod storage;
