//! UI layer for desktop GUI: the app shell and its panels.

pub mod app;

pub use app::TranscriberApp;
