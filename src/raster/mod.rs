pub mod clip;
pub mod cube;
pub mod error;
pub mod geotiff;
pub mod loader;
pub mod reduce;
pub mod source;
