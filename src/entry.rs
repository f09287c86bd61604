//! A data package describing a cyclic voltammogram, together with the
//! bibliography record of the publication it was digitized from.
//!
//! Entries are the elements a [`Database`](crate::Database) yields:
//!
//! ```
//! use echemdb::Database;
//!
//! let database = Database::create_example().unwrap();
//! let entry = database.get("alves_2011_electrochemistry_6010_f1a_solid").unwrap();
//! assert_eq!(entry.to_string(), "Entry('alves_2011_electrochemistry_6010_f1a_solid')");
//! assert_eq!(entry.lookup_str("source.url"), Some("https://doi.org/10.1039/C0CP01001D"));
//! ```

use std::fmt;
use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::{Map, Value};

use crate::bibliography::BibliographyRecord;
use crate::color::DEFAULT_TRACE_COLOR;
use crate::data::model::{DataPackage, Field};
use crate::error::DatabaseError;
use crate::figure::{Figure, Layout, Trace};

/// Default thumbnail size in pixels.
pub const THUMBNAIL_SIZE: (u32, u32) = (96, 72);

// ---------------------------------------------------------------------------
// Field lookup
// ---------------------------------------------------------------------------

/// Read access to the heterogeneous metadata of a package by dotted path.
///
/// Metadata differs between packages, so a lookup answers `None` instead of
/// failing when a path does not exist.
pub trait FieldLookup {
    fn lookup(&self, path: &str) -> Option<&Value>;

    fn lookup_str(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(Value::as_str)
    }
}

impl FieldLookup for DataPackage {
    fn lookup(&self, path: &str) -> Option<&Value> {
        walk(self.descriptor(), path)
    }
}

/// Resolve `path` (e.g. `system.electrodes.working electrode.material`).
///
/// Segments match object keys literally or with `_` read as a space. In an
/// array a segment is either an index or the `name`/`function` of an element.
fn walk<'v>(root: &'v Map<String, Value>, path: &str) -> Option<&'v Value> {
    let mut segments = path.split('.');
    let mut current = object_member(root, segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => object_member(map, segment)?,
            Value::Array(items) => array_member(items, segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn object_member<'v>(map: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    map.get(key)
        .or_else(|| map.get(&key.replace('_', " ")))
}

fn array_member<'v>(items: &'v [Value], segment: &str) -> Option<&'v Value> {
    if let Ok(index) = segment.parse::<usize>() {
        return items.get(index);
    }
    let spaced = segment.replace('_', " ");
    items.iter().find(|item| {
        ["name", "function"].iter().any(|key| {
            item.get(*key)
                .and_then(Value::as_str)
                .is_some_and(|v| v == segment || v == spaced)
        })
    })
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One data package plus its optional bibliography record.
///
/// Two entries are equal when they view the same package with the same
/// citation. The data itself is not compared, so gaps (NaN) in a table do
/// not make an entry unequal to itself.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    package: &'a DataPackage,
    bibliography: Option<&'a BibliographyRecord>,
}

impl<'a> Entry<'a> {
    pub fn new(package: &'a DataPackage, bibliography: Option<&'a BibliographyRecord>) -> Self {
        Entry {
            package,
            bibliography,
        }
    }

    /// Stable identifier, the name of the package's primary resource.
    pub fn identifier(&self) -> &'a str {
        self.package.name()
    }

    pub fn package(&self) -> &'a DataPackage {
        self.package
    }

    pub fn bibliography(&self) -> Option<&'a BibliographyRecord> {
        self.bibliography
    }

    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        walk(self.package.descriptor(), path)
    }

    pub fn lookup_str(&self, path: &str) -> Option<&'a str> {
        self.lookup(path).and_then(Value::as_str)
    }

    /// Key joining this entry to its bibliography record.
    pub fn citation_key(&self) -> Option<&'a str> {
        self.lookup_str("source.citation key")
    }

    pub fn source(&self) -> Option<&'a Value> {
        self.lookup("source")
    }

    pub fn system(&self) -> Option<&'a Value> {
        self.lookup("system")
    }

    pub fn figure_description(&self) -> Option<&'a Value> {
        self.lookup("figure description")
    }

    /// The electrode called `name` (e.g. `WE`) in `system.electrodes`.
    pub fn get_electrode(&self, name: &str) -> Result<&'a Value, DatabaseError> {
        self.lookup("system.electrodes")
            .and_then(Value::as_array)
            .and_then(|electrodes| {
                electrodes
                    .iter()
                    .find(|e| e.get("name").and_then(Value::as_str) == Some(name))
            })
            .ok_or_else(|| DatabaseError::NoElectrode(name.to_string()))
    }

    /// Material of the working electrode, e.g. `Ru`.
    pub fn working_electrode_material(&self) -> Option<&'a str> {
        self.lookup_str("system.electrodes.working electrode.material")
            .or_else(|| self.lookup_str("system.electrodes.WE.material"))
    }

    fn field(&self, name: &str) -> Option<&'a Field> {
        self.package.primary().schema.field(name)
    }

    /// Name of the column holding `name`. `j` falls back to `I` when a
    /// curve was recorded as a current rather than a current density.
    pub fn normalize_field_name(&self, name: &str) -> Result<&'a str, DatabaseError> {
        match self.field(name) {
            Some(field) => Ok(field.name.as_str()),
            None if name == "j" => self.normalize_field_name("I"),
            None => Err(DatabaseError::NoAxis(name.to_string())),
        }
    }

    pub fn field_unit(&self, name: &str) -> Option<&'a str> {
        self.field(name)?.unit.as_deref()
    }

    /// Reference electrode of the potential axis `E`.
    pub fn reference(&self, name: &str) -> Option<&'a str> {
        if name != "E" {
            return None;
        }
        self.field(name)?.reference.as_deref()
    }

    /// Axis title such as `E [V vs. RHE]` or `j [A / m2]`.
    pub fn axis_label(&self, name: &str) -> String {
        let reference = self
            .reference(name)
            .map(|r| format!(" vs. {r}"))
            .unwrap_or_default();
        match self.field_unit(name) {
            Some(unit) => format!("{name} [{unit}{reference}]"),
            None if reference.is_empty() => name.to_string(),
            None => format!("{name} [{}]", reference.trim_start()),
        }
    }

    /// The columns for the axes `x` and `y`, after normalizing their names.
    pub fn curve(&self, x: &str, y: &str) -> Result<(&'a [f64], &'a [f64]), DatabaseError> {
        let table = &self.package.primary().table;
        let column = |name: &str| {
            let name = self.normalize_field_name(name)?;
            table
                .column(name)
                .ok_or_else(|| DatabaseError::NoAxis(name.to_string()))
        };
        Ok((column(x)?, column(y)?))
    }

    /// Legend name: `Fig. 1a: solid` when the source records figure and
    /// curve, the identifier otherwise.
    pub fn figure_name(&self) -> String {
        let scalar = |path: &str| {
            self.lookup(path).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        };
        match (scalar("source.figure"), scalar("source.curve")) {
            (Some(figure), Some(curve)) => format!("Fig. {figure}: {curve}"),
            _ => self.identifier().to_string(),
        }
    }

    /// Plot of this entry; the default is a cyclic voltammogram (`j` vs `E`).
    pub fn plot(&self, x: &str, y: &str) -> Result<Figure, DatabaseError> {
        let x = self.normalize_field_name(x)?;
        let y = self.normalize_field_name(y)?;
        let (xs, ys) = self.curve(x, y)?;

        let mut figure = Figure::new(Layout::single(self.axis_label(x), self.axis_label(y)));
        figure.add_trace(Trace::lines(
            self.figure_name(),
            xs.to_vec(),
            ys.to_vec(),
            DEFAULT_TRACE_COLOR,
        ));
        Ok(figure)
    }

    /// A PNG of the curve on a transparent background, without axes.
    pub fn thumbnail(&self, width: u32, height: u32) -> Result<Vec<u8>, DatabaseError> {
        let (xs, ys) = self.curve("E", "j")?;
        let image = render_curve(xs, ys, width, height);

        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

impl PartialEq for Entry<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.package, other.package)
            && self.bibliography.map(|r| &r.key) == other.bibliography.map(|r| &r.key)
    }
}

impl Eq for Entry<'_> {}

impl fmt::Display for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entry('{}')", self.identifier())
    }
}

// ---------------------------------------------------------------------------
// Thumbnail rasterization
// ---------------------------------------------------------------------------

fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn render_curve(xs: &[f64], ys: &[f64], width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);
    let (Some((x_min, x_max)), Some((y_min, y_max))) = (finite_range(xs), finite_range(ys)) else {
        return image;
    };
    if width == 0 || height == 0 {
        return image;
    }

    let scale = |v: f64, lo: f64, hi: f64, pixels: u32| -> i64 {
        let span = hi - lo;
        let t = if span > 0.0 { (v - lo) / span } else { 0.5 };
        (t * f64::from(pixels - 1)).round() as i64
    };
    let to_pixel = |x: f64, y: f64| {
        (
            scale(x, x_min, x_max, width),
            i64::from(height - 1) - scale(y, y_min, y_max, height),
        )
    };

    let [r, g, b] = DEFAULT_TRACE_COLOR;
    let color = Rgba([r, g, b, 255]);

    let points: Vec<Option<(i64, i64)>> = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (x.is_finite() && y.is_finite()).then(|| to_pixel(x, y)))
        .collect();

    for pair in points.windows(2) {
        match (pair[0], pair[1]) {
            (Some(a), Some(b)) => draw_line(&mut image, a, b, color),
            (Some(a), None) => draw_line(&mut image, a, a, color),
            _ => {}
        }
    }
    if let [Some(only)] = points.as_slice() {
        draw_line(&mut image, *only, *only, color);
    }
    image
}

/// Bresenham's line algorithm; pixels outside the image are dropped.
fn draw_line(image: &mut RgbaImage, from: (i64, i64), to: (i64, i64), color: Rgba<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if (0..i64::from(image.width())).contains(&x) && (0..i64::from(image.height())).contains(&y) {
            image.put_pixel(x as u32, y as u32, color);
        }
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
