use error_stack::{Report, ResultExt};
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use topology_core::pipeline::TopologyResult;
use topology_core::{Affine, LabelGrid};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed reading raster")]
    Read,
    #[error("raster file is malformed")]
    Malformed,
    #[error("failed writing output")]
    Write,
}

/// Source of a label raster. Kept as a trait so `core` never has to know
/// about any concrete file format, per spec.md §6.3's I/O-adapter split.
pub trait RasterSource {
    fn read(&self) -> Result<LabelGrid, Report<IoError>>;
}

/// Destination for the engine's output polygons.
pub trait PolygonSink {
    fn write(&self, result: &TopologyResult) -> Result<(), Report<IoError>>;
}

/// A deliberately minimal text raster format, good enough to drive the CLI
/// and integration tests end-to-end without vendoring a GDAL binding:
///
/// ```text
/// <width> <height>
/// <origin_x> <pixel_width> <row_rotation> <origin_y> <col_rotation> <pixel_height>
/// <crs>
/// <nodata-or-"none">
/// <height> rows of <width> space-separated i64 labels
/// ```
pub struct TextGridSource {
    pub path: PathBuf,
}

impl RasterSource for TextGridSource {
    fn read(&self) -> Result<LabelGrid, Report<IoError>> {
        let text = std::fs::read_to_string(&self.path).change_context(IoError::Read)?;
        let mut lines = text.lines();

        let dims = lines.next().ok_or_else(|| Report::new(IoError::Malformed)).attach_printable("missing dimensions line")?;
        let mut dims = dims.split_whitespace();
        let width: u32 = parse_field(dims.next(), "width")?;
        let height: u32 = parse_field(dims.next(), "height")?;

        let affine_line = lines.next().ok_or_else(|| Report::new(IoError::Malformed)).attach_printable("missing affine line")?;
        let values: Result<Vec<f64>, _> = affine_line.split_whitespace().map(|v| v.parse::<f64>()).collect();
        let values = values.change_context(IoError::Malformed).attach_printable("affine values must be floats")?;
        if values.len() != 6 {
            return Err(Report::new(IoError::Malformed).attach_printable("affine line must have exactly 6 values"));
        }
        let affine = Affine::from_tuple([values[0], values[1], values[2], values[3], values[4], values[5]]);

        let crs = lines.next().ok_or_else(|| Report::new(IoError::Malformed)).attach_printable("missing crs line")?.trim().to_string();

        let nodata_line = lines.next().ok_or_else(|| Report::new(IoError::Malformed)).attach_printable("missing nodata line")?.trim();
        let nodata = if nodata_line.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(nodata_line.parse::<i64>().change_context(IoError::Malformed).attach_printable("nodata must be an integer or \"none\"")?)
        };

        let mut data = Vec::with_capacity((width as usize) * (height as usize));
        for row in lines {
            if row.trim().is_empty() {
                continue;
            }
            for cell in row.split_whitespace() {
                data.push(cell.parse::<i64>().change_context(IoError::Malformed).attach_printable("row value must be an integer")?);
            }
        }
        if data.len() != (width as usize) * (height as usize) {
            return Err(Report::new(IoError::Malformed).attach_printable(format!(
                "expected {} pixel values, found {}",
                width as usize * height as usize,
                data.len()
            )));
        }

        Ok(LabelGrid::new(width, height, data, nodata, affine, crs))
    }
}

fn parse_field(value: Option<&str>, name: &'static str) -> Result<u32, Report<IoError>> {
    value
        .ok_or_else(|| Report::new(IoError::Malformed).attach_printable(format!("missing {name}")))?
        .parse::<u32>()
        .change_context(IoError::Malformed)
        .attach_printable(format!("{name} must be a non-negative integer"))
}

/// Writes a GeoJSON `FeatureCollection`, one feature per output polygon
/// (i.e. one feature per element of each label's `MultiPolygon`), with a
/// `label` property carrying the region label.
pub struct GeoJsonSink {
    pub path: PathBuf,
}

impl PolygonSink for GeoJsonSink {
    fn write(&self, result: &TopologyResult) -> Result<(), Report<IoError>> {
        let mut features = Vec::new();
        let mut labels: Vec<&i64> = result.polygons.keys().collect();
        labels.sort();
        for label in labels {
            let multi = &result.polygons[label];
            for polygon in &multi.0 {
                features.push(json!({
                    "type": "Feature",
                    "properties": { "label": label },
                    "geometry": polygon_to_geometry(polygon),
                }));
            }
        }
        let collection = json!({
            "type": "FeatureCollection",
            "features": features,
        });
        let mut file = std::fs::File::create(&self.path).change_context(IoError::Write)?;
        file.write_all(serde_json::to_string_pretty(&collection).change_context(IoError::Write)?.as_bytes())
            .change_context(IoError::Write)?;
        Ok(())
    }
}

fn polygon_to_geometry(polygon: &geo::Polygon<f64>) -> Value {
    let mut rings = vec![ring_to_coords(polygon.exterior())];
    for interior in polygon.interiors() {
        rings.push(ring_to_coords(interior));
    }
    json!({ "type": "Polygon", "coordinates": rings })
}

fn ring_to_coords(ring: &geo::LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

pub fn text_source(path: impl AsRef<Path>) -> TextGridSource {
    TextGridSource { path: path.as_ref().to_path_buf() }
}

pub fn geojson_sink(path: impl AsRef<Path>) -> GeoJsonSink {
    GeoJsonSink { path: path.as_ref().to_path_buf() }
}
