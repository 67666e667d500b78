pub mod error;
pub mod geojson_file;
pub mod source;
