pub mod handlers;
pub mod pages;
pub mod server;

pub use server::{shutdown_signal, WebServer};
