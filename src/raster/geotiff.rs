//! Single-band GeoTIFF output for flood composites.

use crate::raster::cube::FloodComposite;
use crate::raster::error::RasterError;
use crate::types::crs::Crs;
use crate::types::pixel::NODATA;
use log::info;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tiff::encoder::compression::Lzw;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GT_CITATION: u16 = 1026;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

/// EPSG codes of the geographic systems flood rasters and boundaries come in.
const GEOGRAPHIC_EPSG: [u16; 3] = [4326, 4618, 4674];

/// GeoKey directory plus the ASCII parameters it references.
///
/// A WKT citation longer than a GeoKey count can address is an error.
fn geo_keys(crs: &Crs) -> Result<(Vec<u16>, Option<String>), RasterError> {
    let mut keys: Vec<[u16; 4]> = Vec::new();
    let mut ascii = None;
    match crs.epsg_code().and_then(|code| u16::try_from(code).ok()) {
        Some(code) if GEOGRAPHIC_EPSG.contains(&code) => {
            keys.push([GT_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
            keys.push([GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.push([GEOGRAPHIC_TYPE, 0, 1, code]);
        }
        Some(code) => {
            keys.push([GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED]);
            keys.push([GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.push([PROJECTED_CS_TYPE, 0, 1, code]);
        }
        None => {
            // GeoASCIIParams entries are terminated by '|'.
            let citation = format!("{}|", crs.as_str());
            let count = u16::try_from(citation.len()).map_err(|_| RasterError::CitationTooLong {
                len: citation.len(),
            })?;
            keys.push([GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED]);
            keys.push([GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.push([GT_CITATION, GEO_ASCII_PARAMS, count, 0]);
            keys.push([PROJECTED_CS_TYPE, 0, 1, USER_DEFINED]);
            ascii = Some(citation);
        }
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    Ok((directory, ascii))
}

/// Encodes `composite` as an LZW-compressed, single-band `u8` GeoTIFF.
///
/// The output depends only on the composite, so encoding the same composite
/// twice yields identical bytes.
pub fn encode_geotiff(composite: &FloodComposite) -> Result<Vec<u8>, RasterError> {
    let (rows, cols) = composite.data().dim();
    let (Ok(height), Ok(width)) = (u32::try_from(rows), u32::try_from(cols)) else {
        return Err(RasterError::TooLarge { rows, cols });
    };
    let transform = composite.transform();
    let (directory, ascii) = geo_keys(composite.crs())?;
    let pixels: Vec<u8> = composite.data().iter().copied().collect();

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buffer).map_err(RasterError::GeoTiffEncode)?;
        let mut image = encoder
            .new_image_with_compression::<colortype::Gray8, _>(width, height, Lzw::default())
            .map_err(RasterError::GeoTiffEncode)?;

        let tags = image.encoder();
        tags.write_tag(
            Tag::Unknown(MODEL_PIXEL_SCALE),
            &[transform.pixel_width, transform.pixel_height, 0.0][..],
        )
        .map_err(RasterError::GeoTiffEncode)?;
        tags.write_tag(
            Tag::Unknown(MODEL_TIEPOINT),
            &[0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0][..],
        )
        .map_err(RasterError::GeoTiffEncode)?;
        tags.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &directory[..])
            .map_err(RasterError::GeoTiffEncode)?;
        if let Some(ascii) = &ascii {
            tags.write_tag(Tag::Unknown(GEO_ASCII_PARAMS), ascii.as_str())
                .map_err(RasterError::GeoTiffEncode)?;
        }
        tags.write_tag(Tag::Unknown(GDAL_NODATA), NODATA.to_string().as_str())
            .map_err(RasterError::GeoTiffEncode)?;

        image.write_data(&pixels).map_err(RasterError::GeoTiffEncode)?;
    }
    Ok(buffer.into_inner())
}

/// Writes `bytes` to a temporary file next to `path` and moves it over `path`.
fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), RasterError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file =
        NamedTempFile::new_in(parent).map_err(|e| RasterError::FileWrite(path.to_path_buf(), e))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| RasterError::FileWrite(path.to_path_buf(), e))?;
    file.persist(path)
        .map_err(|e| RasterError::FilePersist(path.to_path_buf(), Box::new(e)))?;
    Ok(())
}

impl FloodComposite {
    /// Writes the composite as a GeoTIFF at `path`, replacing any previous
    /// file there.
    pub async fn write_geotiff(&self, path: &Path) -> Result<(), RasterError> {
        let composite = self.clone();
        let path_buf = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let bytes = encode_geotiff(&composite)?;
            replace_file(&path_buf, &bytes)?;
            Ok::<_, RasterError>(bytes.len())
        })
        .await?
        .map(|size| {
            info!("Wrote {} byte composite to {}", size, path.display());
        })
    }
}
