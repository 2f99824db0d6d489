//! Eligibility perimeter of the urban-operation program.
//!
//! The perimeter is loaded once at startup and shared read-only across every
//! session, so the containment test needs no synchronization. Vertices are
//! stored `(longitude, latitude)` to match the KML source ordering; the
//! containment test consumes them as `(x, y)` with the same convention.

use std::path::Path;
use std::sync::OnceLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::config::PerimeterConfig;

/// WGS84 decimal-degree pair produced by map clicks or geocoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Axis-aligned box around every perimeter vertex, used for initial map
/// framing only, never for eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerimeterBounds {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl PerimeterBounds {
    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: (self.min_latitude + self.max_latitude) / 2.0,
            longitude: (self.min_longitude + self.max_longitude) / 2.0,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }
}

/// Errors raised while loading the perimeter. All of them are fatal at
/// startup; a running process never sees a malformed perimeter.
#[derive(Debug, thiserror::Error)]
pub enum PerimeterError {
    #[error("perimeter ring needs at least 3 vertices, found {found}")]
    TooFewVertices { found: usize },
    #[error("perimeter vertex is not a finite coordinate")]
    NonFiniteVertex,
    #[error("KML document contains no <coordinates> element")]
    MissingCoordinates,
    #[error("malformed coordinate tuple '{0}'")]
    MalformedTuple(String),
    #[error("failed to parse KML: {0}")]
    Kml(#[from] quick_xml::Error),
    #[error("failed to read perimeter file: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed eligible boundary of the program: one or more closed rings of
/// `(longitude, latitude)` vertices, immutable after load.
#[derive(Debug)]
pub struct Perimeter {
    rings: Vec<Vec<(f64, f64)>>,
    bounds: OnceLock<PerimeterBounds>,
}

impl Perimeter {
    /// Builds a perimeter from rings of `(longitude, latitude)` vertices.
    /// The closing vertex may be repeated or omitted; rings are closed
    /// implicitly. Rings with fewer than three distinct vertices are
    /// rejected.
    pub fn new(rings: Vec<Vec<(f64, f64)>>) -> Result<Self, PerimeterError> {
        if rings.is_empty() {
            return Err(PerimeterError::TooFewVertices { found: 0 });
        }

        let mut cleaned = Vec::with_capacity(rings.len());
        for mut ring in rings {
            if ring.len() > 1 && ring.first() == ring.last() {
                ring.pop();
            }
            if ring.len() < 3 {
                return Err(PerimeterError::TooFewVertices { found: ring.len() });
            }
            if ring
                .iter()
                .any(|(lon, lat)| !lon.is_finite() || !lat.is_finite())
            {
                return Err(PerimeterError::NonFiniteVertex);
            }
            cleaned.push(ring);
        }

        Ok(Self {
            rings: cleaned,
            bounds: OnceLock::new(),
        })
    }

    /// Loads the perimeter from the configured KML file, falling back to the
    /// built-in standard boundary when no file is configured.
    pub fn load(config: &PerimeterConfig) -> Result<Self, PerimeterError> {
        let perimeter = match &config.kml_path {
            Some(path) => {
                let perimeter = Self::from_kml_file(path)?;
                tracing::info!(path = %path.display(), rings = perimeter.rings().len(), "enrollment perimeter loaded from KML");
                perimeter
            }
            None => {
                let perimeter = Self::standard();
                tracing::info!(rings = perimeter.rings().len(), "using built-in enrollment perimeter");
                perimeter
            }
        };
        Ok(perimeter)
    }

    pub fn from_kml_file(path: &Path) -> Result<Self, PerimeterError> {
        let document = std::fs::read_to_string(path)?;
        Self::from_kml_str(&document)
    }

    /// Parses every `<coordinates>` element of a KML document into a ring.
    /// KML coordinate tuples are `longitude,latitude[,altitude]` separated
    /// by whitespace; altitude is ignored.
    pub fn from_kml_str(document: &str) -> Result<Self, PerimeterError> {
        let mut reader = Reader::from_str(document);
        reader.config_mut().trim_text(true);

        let mut rings = Vec::new();
        let mut in_coordinates = false;
        let mut buffer = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(element) if element.local_name().as_ref() == b"coordinates" => {
                    in_coordinates = true;
                    buffer.clear();
                }
                Event::Text(text) if in_coordinates => {
                    buffer.push_str(&text.unescape()?);
                    buffer.push(' ');
                }
                Event::End(element) if element.local_name().as_ref() == b"coordinates" => {
                    in_coordinates = false;
                    rings.push(parse_coordinate_tuples(&buffer)?);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if rings.is_empty() {
            return Err(PerimeterError::MissingCoordinates);
        }

        Self::new(rings)
    }

    /// Built-in standard boundary of the urban operation along the river
    /// basin, matching the shape shipped with the public map.
    pub fn standard() -> Self {
        let ring = vec![
            (-46.640, -23.560),
            (-46.625, -23.540),
            (-46.600, -23.525),
            (-46.575, -23.528),
            (-46.558, -23.545),
            (-46.550, -23.570),
            (-46.556, -23.600),
            (-46.570, -23.620),
            (-46.590, -23.635),
            (-46.615, -23.628),
            (-46.632, -23.605),
            (-46.638, -23.580),
        ];

        Self::new(vec![ring]).expect("built-in boundary is well formed")
    }

    /// Ray-casting point-in-polygon test. Pure and deterministic; safe to
    /// call concurrently from any number of sessions.
    ///
    /// Boundary convention: the half-open crossing rule is applied with no
    /// epsilon special case. For an axis-aligned square this classifies a
    /// point on the west edge as inside and a point on the east edge as
    /// outside.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        if !latitude.is_finite() || !longitude.is_finite() {
            return false;
        }
        self.rings
            .iter()
            .any(|ring| ring_contains(ring, longitude, latitude))
    }

    pub fn contains_coordinate(&self, coordinate: Coordinate) -> bool {
        self.contains(coordinate.latitude, coordinate.longitude)
    }

    /// Bounding box over every vertex, computed once per process.
    pub fn bounds(&self) -> PerimeterBounds {
        *self.bounds.get_or_init(|| {
            let mut bounds = PerimeterBounds {
                min_latitude: f64::INFINITY,
                max_latitude: f64::NEG_INFINITY,
                min_longitude: f64::INFINITY,
                max_longitude: f64::NEG_INFINITY,
            };

            for (lon, lat) in self.rings.iter().flatten() {
                bounds.min_latitude = bounds.min_latitude.min(*lat);
                bounds.max_latitude = bounds.max_latitude.max(*lat);
                bounds.min_longitude = bounds.min_longitude.min(*lon);
                bounds.max_longitude = bounds.max_longitude.max(*lon);
            }

            bounds
        })
    }

    pub fn rings(&self) -> &[Vec<(f64, f64)>] {
        &self.rings
    }
}

fn parse_coordinate_tuples(raw: &str) -> Result<Vec<(f64, f64)>, PerimeterError> {
    let mut ring = Vec::new();
    for tuple in raw.split_whitespace() {
        let mut parts = tuple.split(',');
        let lon = parts.next().and_then(|part| part.parse::<f64>().ok());
        let lat = parts.next().and_then(|part| part.parse::<f64>().ok());
        match (lon, lat) {
            (Some(lon), Some(lat)) => ring.push((lon, lat)),
            _ => return Err(PerimeterError::MalformedTuple(tuple.to_string())),
        }
    }
    Ok(ring)
}

fn ring_contains(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
