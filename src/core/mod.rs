pub mod config;
pub mod constants;
pub mod context;
pub mod geo;
pub mod session;
pub mod surface;
pub(crate) mod sync;
pub mod viewer;
pub mod zoom;
