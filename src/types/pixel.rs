//! The three-valued pixel domain of the GFM `ensemble_flood_extent` band.
//!
//! Time-series rasters keep all three values until they are reduced; composites
//! only ever contain [`NOT_FLOODED`] and [`FLOODED`].

/// Observed, not flooded.
pub const NOT_FLOODED: u8 = 0;
/// Observed, flooded.
pub const FLOODED: u8 = 1;
/// No observation. Never counted as flood or as a valid observation.
pub const NODATA: u8 = 255;
