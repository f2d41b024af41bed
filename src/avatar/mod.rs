//! Animated avatar window.

pub mod app;
pub mod scene;

pub use app::{GangaApp, WINDOW_TITLE};
