//! SVG route preview.
//!
//! Renders an ordered route as an SVG string using the [`svg`] crate for
//! document construction, XML escaping, and path data formatting.
//!
//! Each pen-down stroke becomes a `<path>` element using `M` (move to)
//! and `L` (line to) commands, in drawing order. Optionally, every pen-up
//! move is drawn as a dashed `<line>` inside `<g id="travel">`, so the
//! effect of an optimization run can be inspected by eye.
//!
//! Coordinates are plotter millimetres. The `viewBox` is the bounding box
//! of everything drawn plus a margin, and the document width and height
//! are set in `mm` so the preview prints at true scale.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Group, Line, Path as SvgPath, Title};
use svg::node::{Node, Text, Value};

use plotroute_core::{Path, Point};

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically by
/// the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the input drawing's file stem.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    ///
    /// Typically a one-line travel summary.
    pub description: Option<&'a str>,

    /// Serialized optimizer configuration, emitted inside `<metadata>`
    /// wrapped in a namespaced `<plotroute:config>` element so the
    /// preview records how it was produced.
    pub config_json: Option<&'a str>,
}

/// Rendering options for [`to_svg`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgOptions {
    /// Draw pen-up moves as dashed lines.
    pub show_travel: bool,
    /// Pen position before the first stroke. When set and travel is
    /// shown, the lead-in move from here is drawn too.
    pub home: Option<Point>,
    /// Stroke width for pen-down paths, in millimetres.
    pub stroke_width: f64,
    /// Empty border around the drawing, in millimetres.
    pub margin: f64,
}

impl SvgOptions {
    /// Default stroke width in millimetres.
    pub const DEFAULT_STROKE_WIDTH: f64 = 0.3;
    /// Default margin in millimetres.
    pub const DEFAULT_MARGIN: f64 = 5.0;
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            show_travel: false,
            home: None,
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
            margin: Self::DEFAULT_MARGIN,
        }
    }
}

/// Build an SVG path `d` attribute string from a stroke.
///
/// Uses `M` for the first point and `L` for subsequent points.
/// Returns an empty string for strokes with fewer than 2 points.
///
/// Coordinates are formatted by the [`svg`] crate using `f32` precision,
/// well below any plotter's resolution.
///
/// # Examples
///
/// ```
/// use plotroute_core::{Path, Point};
/// use plotroute_export::build_path_data;
///
/// let path = Path::new(vec![Point::new(10.0, 20.0), Point::new(30.0, 40.0)])?;
/// assert_eq!(build_path_data(&path), "M10,20 L30,40");
/// # Ok::<(), plotroute_core::PathError>(())
/// ```
#[must_use]
pub fn build_path_data(path: &Path) -> String {
    let points = path.points();
    if points.len() < 2 {
        return String::new();
    }

    let first = &points[0];
    let mut data = Data::new().move_to((first.x, first.y));
    for p in &points[1..] {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data))
}

/// Pen-up moves of a route, in order, as `(from, to)` pairs.
///
/// Includes the lead-in from `home` when given. Moves of zero length are
/// kept; the caller decides whether they are worth drawing.
#[must_use]
pub fn travel_moves(paths: &[Path], home: Option<Point>) -> Vec<(Point, Point)> {
    let lead_in = home
        .zip(paths.first())
        .map(|(home, first)| (home, first.start()));
    lead_in
        .into_iter()
        .chain(paths.windows(2).map(|pair| (pair[0].end(), pair[1].start())))
        .collect()
}

/// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` of every point
/// drawn, or `None` when there is nothing to draw.
fn bounds<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<(f64, f64, f64, f64)> {
    points.into_iter().fold(None, |acc, p| {
        Some(match acc {
            None => (p.x, p.y, p.x, p.y),
            Some((x0, y0, x1, y1)) => (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        })
    })
}

/// Serialize an ordered route into an SVG document string.
///
/// Each [`Path`] with 2 or more points becomes a `<path>` element, in
/// route order. Single-point strokes are skipped (they cannot form a
/// visible line segment) but still take part in the travel overlay.
///
/// If [`SvgMetadata::title`] or [`SvgMetadata::description`] is provided,
/// the corresponding `<title>` / `<desc>` element is emitted after the
/// opening `<svg>` tag. If [`SvgMetadata::config_json`] is provided, a
/// `<metadata>` element carries it.
///
/// # Examples
///
/// ```
/// use plotroute_core::{Path, Point};
/// use plotroute_export::{SvgMetadata, SvgOptions, to_svg};
///
/// let route = vec![
///     Path::new(vec![Point::new(10.0, 15.0), Point::new(12.5, 18.3)])?,
///     Path::new(vec![Point::new(20.0, 15.0), Point::new(30.0, 15.0)])?,
/// ];
/// let metadata = SvgMetadata {
///     title: Some("hatching"),
///     ..SvgMetadata::default()
/// };
/// let options = SvgOptions {
///     show_travel: true,
///     ..SvgOptions::default()
/// };
/// let svg = to_svg(&route, &metadata, &options);
/// assert!(svg.contains("<title>hatching</title>"));
/// assert!(svg.contains("M10,15 L12.5,18.3"));
/// assert!(svg.contains(r#"<g id="travel""#));
/// # Ok::<(), plotroute_core::PathError>(())
/// ```
#[must_use]
pub fn to_svg(paths: &[Path], metadata: &SvgMetadata<'_>, options: &SvgOptions) -> String {
    let moves = if options.show_travel {
        travel_moves(paths, options.home)
    } else {
        Vec::new()
    };

    let drawn = paths.iter().flat_map(Path::points);
    let travel_ends = moves.iter().flat_map(|(from, to)| [from, to]);
    let (min_x, min_y, max_x, max_y) = bounds(drawn.chain(travel_ends)).unwrap_or_default();
    let margin = options.margin.max(0.0);
    let x = min_x - margin;
    let y = min_y - margin;
    let width = 2.0f64.mul_add(margin, max_x - min_x);
    let height = 2.0f64.mul_add(margin, max_y - min_y);

    let mut doc = Document::new()
        .set("width", format!("{width}mm"))
        .set("height", format!("{height}mm"))
        .set("viewBox", (x, y, width, height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("plotroute:config");
        config_el.assign("xmlns:plotroute", "urn:plotroute:config:1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    for path in paths {
        let d = build_path_data(path);
        if d.is_empty() {
            continue;
        }

        let element = SvgPath::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", options.stroke_width)
            .set("stroke-linecap", "round")
            .set("stroke-linejoin", "round");
        doc = doc.add(element);
    }

    if !moves.is_empty() {
        let mut group = Group::new()
            .set("id", "travel")
            .set("stroke", "red")
            .set("stroke-width", options.stroke_width / 2.0)
            .set("stroke-dasharray", "1 1");
        for (from, to) in &moves {
            group = group.add(
                Line::new()
                    .set("x1", from.x)
                    .set("y1", from.y)
                    .set("x2", to.x)
                    .set("y2", to.y),
            );
        }
        doc = doc.add(group);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
