//! Integration test: optimize a small drawing and render the route preview.

#![allow(clippy::unwrap_used)]

use plotroute_core::{OptimizeConfig, Path, Point, Unmonitored, optimize};
use plotroute_export::{SvgMetadata, SvgOptions, to_svg, travel_moves};

/// A square outline drawn as four separate strokes, plus a scatter of
/// short ticks inside it, in an order that wanders back and forth.
fn drawing() -> Vec<Path> {
    let side = |a: (f64, f64), b: (f64, f64)| {
        Path::new(vec![Point::new(a.0, a.1), Point::new(b.0, b.1)]).unwrap()
    };
    let mut paths = vec![
        side((0.0, 0.0), (40.0, 0.0)),
        side((40.0, 40.0), (0.0, 40.0)),
        side((40.0, 0.0), (40.0, 40.0)),
        side((0.0, 40.0), (0.0, 0.0)),
    ];
    for i in [3, 1, 4, 0, 2] {
        let x = 8.0 + f64::from(i) * 6.0;
        paths.push(side((x, 20.0), (x, 24.0)));
    }
    paths
}

#[test]
fn optimized_route_renders_with_travel_overlay() {
    let config = OptimizeConfig::default();
    let result = optimize(&drawing(), &config, &Unmonitored).unwrap();

    // The square's sides touch end to start and merge into one stroke.
    assert!(result.merged >= 3, "merged {}", result.merged);

    let config_json = serde_json::to_string(&config).unwrap();
    let description = format!(
        "pen-up travel {:.1}mm -> {:.1}mm",
        result.summary.input_travel, result.summary.final_travel
    );
    let metadata = SvgMetadata {
        title: Some("square-with-ticks"),
        description: Some(&description),
        config_json: Some(&config_json),
    };
    let options = SvgOptions {
        show_travel: true,
        home: Some(config.home),
        ..SvgOptions::default()
    };
    let svg = to_svg(&result.paths, &metadata, &options);

    assert!(svg.contains("<svg"));
    assert!(svg.contains("</svg>"));
    assert!(svg.contains("<title>square-with-ticks</title>"));
    assert_eq!(svg.matches("<path").count(), result.paths.len());

    let moves = travel_moves(&result.paths, Some(config.home));
    assert_eq!(moves.len(), result.paths.len());
    assert_eq!(svg.matches("<line").count(), moves.len());

    let drawn_travel: f64 = moves.iter().map(|(a, b)| a.distance(*b)).sum();
    assert!((drawn_travel - result.summary.final_travel).abs() < 1e-9);
}
