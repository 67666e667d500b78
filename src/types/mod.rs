pub mod calendar;
pub mod crs;
pub mod item;
pub mod municipality;
pub mod pixel;
pub mod record;
