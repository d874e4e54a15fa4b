//! plotroute-export: Pure format serializers (sans-IO)
//!
//! Converts optimized routes into output formats. Currently supports an
//! SVG preview with an optional pen-up travel overlay.

pub mod svg;

pub use svg::{SvgMetadata, SvgOptions, build_path_data, to_svg, travel_moves};
