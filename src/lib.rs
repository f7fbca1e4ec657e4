pub mod app;
pub mod collection;
pub mod config;
pub mod debounce;
pub mod detail;
pub mod genres;
pub mod list;
pub mod models;
pub mod session;
pub mod storage;
pub mod tmdb;
