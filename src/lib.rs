pub mod config;
pub mod error;
pub mod events;
pub mod slideshow;
pub mod tasks {
    pub mod files;
    pub mod loader;
    pub mod viewer;
}
