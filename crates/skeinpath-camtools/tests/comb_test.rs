use proptest::prelude::*;
use skeinpath_camtools::comb::{jitter_fraction, LayerGeometry};
use skeinpath_camtools::{corridors_for_loop, CombParameters, CombStage, LayerPolygonStore, TravelRouter};
use skeinpath_core::{polygon, LoopId, Point2, Point3};
use skeinpath_gcode::{
    StageReport, StreamEmitter, StreamParameters, StreamParser, ToolpathEvent, ToolpathStage,
};

const Z: f64 = 0.4;

fn store_with_loop(points: &[(f64, f64)]) -> LayerPolygonStore {
    let mut store = LayerPolygonStore::new();
    store.begin_layer(Z);
    for &(x, y) in points {
        store.add_boundary_point(Z, Point3::new(x, y, Z));
    }
    store
}

/// Clockwise hole spanning 0..10 on both axes
fn hole_store() -> LayerPolygonStore {
    store_with_loop(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)])
}

fn stream_with_inset(fill_inset: f64) -> StreamParameters {
    StreamParameters {
        fill_inset,
        ..StreamParameters::default()
    }
}

fn route(
    store: &LayerPolygonStore,
    parameters: &CombParameters,
    from: Point3,
    to: Point3,
    fill_inset: f64,
) -> (Vec<Point3>, StageReport) {
    let router = TravelRouter::new(parameters, store);
    let mut layer = LayerGeometry::new(Z, fill_inset);
    let mut report = StageReport::new("comb");
    let path = router.route(from, to, &mut layer, &stream_with_inset(fill_inset), &mut report);
    (path, report)
}

fn strictly_inside_hole(p: Point3) -> bool {
    p.x > 1e-9 && p.x < 10.0 - 1e-9 && p.y > 1e-9 && p.y < 10.0 - 1e-9
}

/// True when the segments cross away from their endpoints
fn segments_cross(a1: Point2, a2: Point2, b1: Point2, b2: Point2) -> bool {
    let r = a2 - a1;
    let s = b2 - b1;
    let denominator = r.cross(s);
    if denominator.abs() < 1e-12 {
        return false;
    }
    let t = (b1 - a1).cross(s) / denominator;
    let u = (b1 - a1).cross(r) / denominator;
    let inside = |v: f64| v > 1e-6 && v < 1.0 - 1e-6;
    inside(t) && inside(u)
}

fn crosses_loop(path: &[Point2], loop_: &[Point2]) -> bool {
    let n = loop_.len();
    path.windows(2).any(|segment| {
        (0..n).any(|i| segments_cross(segment[0], segment[1], loop_[i], loop_[(i + 1) % n]))
    })
}

fn travel_length(from: Point3, path: &[Point3], to: Point3) -> f64 {
    let mut points: Vec<Point2> = vec![from.xy()];
    points.extend(path.iter().map(|p| p.xy()));
    points.push(to.xy());
    polygon::path_length(&points)
}

#[test]
fn test_travel_detours_around_hole() {
    let store = hole_store();
    let parameters = CombParameters::default();
    let from = Point3::new(-2.0, 5.0, Z);
    let to = Point3::new(12.0, 5.0, Z);
    let (path, report) = route(&store, &parameters, from, to, 1.0);

    assert!(path.len() >= 3, "expected a detour, got {:?}", path);
    let first = path[0];
    let last = path[path.len() - 1];
    assert!((first.x + 0.5).abs() < 1e-6 && (first.y - 5.0).abs() < 1e-6);
    assert!((last.x - 10.5).abs() < 1e-6 && (last.y - 5.0).abs() < 1e-6);
    assert!(path.iter().all(|p| !strictly_inside_hole(*p)));
    assert!(path.iter().any(|p| (p.y - 5.0).abs() > 5.0));
    assert!(path.iter().all(|p| p.z == Z));
    assert_eq!(report.count("missing_corridor"), 0);
}

#[test]
fn test_comb_stage_inserts_detour_before_travel() {
    let text = "(<fillInset> 1.0 )\n\
                (<layerStart> 0.4 )\n\
                (<surroundingLoop> )\n\
                (<boundaryPoint> X0 Y0 Z0.4 )\n\
                (<boundaryPoint> X0 Y10 Z0.4 )\n\
                (<boundaryPoint> X10 Y10 Z0.4 )\n\
                (<boundaryPoint> X10 Y0 Z0.4 )\n\
                (</surroundingLoop> )\n\
                G1 X-2 Y5 Z0.4 F1200\n\
                G1 X12 Y5 Z0.4";
    let mut lines = StreamParser::new().parse_text(text);
    let original = lines.len();
    let report = CombStage::default().process(&mut lines);

    assert_eq!(report.count("routed_travels"), 1);
    assert_eq!(lines.len(), original + report.count("inserted_moves"));
    let inserted = report.count("inserted_moves");
    assert!(lines[..lines.len() - 1]
        .iter()
        .rev()
        .take(inserted)
        .all(|l| l.is_synthesized()));
    assert_eq!(lines.last().and_then(|l| l.text.as_deref()), Some("G1 X12 Y5 Z0.4"));
}

#[test]
fn test_bridge_layer_widens_the_detour() {
    let text = |bridge: &str| {
        format!(
            "(<fillInset> 1.0 )\n\
             (<bridgeExtrusionWidthOverSolid> 2.0 )\n\
             (<layerStart> 0.4 )\n\
             {}\
             (<surroundingLoop> )\n\
             (<boundaryPoint> X0 Y0 Z0.4 )\n\
             (<boundaryPoint> X0 Y10 Z0.4 )\n\
             (<boundaryPoint> X10 Y10 Z0.4 )\n\
             (<boundaryPoint> X10 Y0 Z0.4 )\n\
             (</surroundingLoop> )\n\
             G1 X-3 Y5 Z0.4 F1200\n\
             G1 X13 Y5 Z0.4",
            bridge
        )
    };
    let first_detour_x = |text: String| {
        let mut lines = StreamParser::new().parse_text(&text);
        let report = CombStage::default().process(&mut lines);
        assert_eq!(report.count("routed_travels"), 1);
        let first = lines.iter().position(|l| l.is_synthesized()).unwrap();
        lines[first].move_target().unwrap().x
    };

    // corridors sit half the layer inset from the hole
    assert!((first_detour_x(text("")) + 0.5).abs() < 1e-6);
    assert!((first_detour_x(text("(<bridgeLayer> )\n")) + 1.0).abs() < 1e-6);
}

#[test]
fn test_missing_corridor_is_counted() {
    // too small to hold any corridor at this inset
    let store = store_with_loop(&[(0.0, 0.0), (0.1, 0.0), (0.0, 0.1)]);
    let parameters = CombParameters::default();
    let from = Point3::new(0.0, 0.0, Z);
    let to = Point3::new(5.0, 5.0, Z);
    let (path, report) = route(&store, &parameters, from, to, 1.0);

    assert!(path.is_empty());
    assert_eq!(report.count("missing_corridor"), 1);
}

#[test]
fn test_departure_follows_outer_loop() {
    let store = store_with_loop(&[(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)]);
    let parameters = CombParameters {
        minimum_departure_distance_over_perimeter_width: 10.0,
        ..CombParameters::default()
    };
    let from = Point3::new(0.0, 0.0, Z);
    let to = Point3::new(10.0, 10.0, Z);
    let (path, report) = route(&store, &parameters, from, to, 0.36);

    assert_eq!(path.first(), Some(&Point3::new(20.0, 0.0, Z)));
    assert_eq!(report.count("departures"), 1);
}

#[test]
fn test_departure_skipped_for_holes() {
    let store = hole_store();
    let parameters = CombParameters {
        minimum_departure_distance_over_perimeter_width: 10.0,
        ..CombParameters::default()
    };
    let from = Point3::new(0.0, 0.0, Z);
    let to = Point3::new(-5.0, -5.0, Z);
    let (_, report) = route(&store, &parameters, from, to, 1.0);
    assert_eq!(report.count("departures"), 0);
}

fn perimeter_stream() -> String {
    let mut text = String::new();
    for z in [0.4, 0.8] {
        text.push_str(&format!("(<layerStart> {} )\n(<surroundingLoop> )\n", z));
        for (x, y) in [(0, 0), (20, 0), (20, 20), (0, 20)] {
            text.push_str(&format!("(<boundaryPoint> X{} Y{} Z{} )\n", x, y, z));
        }
        text.push_str("(</surroundingLoop> )\n(<perimeter> outer )\n");
        text.push_str(&format!("G1 X0 Y0 Z{} F1200\nM101\n", z));
        for (x, y) in [(20, 0), (20, 20), (0, 20), (0, 0)] {
            text.push_str(&format!("G1 X{} Y{} Z{}\n", x, y, z));
        }
        text.push_str("M103\n(</perimeter> )\n");
    }
    text
}

#[test]
fn test_loop_start_jitter_moves_second_layer_seam() {
    let mut lines = StreamParser::new().parse_text(&perimeter_stream());
    let report = CombStage::default().process(&mut lines);
    assert_eq!(report.count("jittered_loops"), 2);

    let on_indices: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.event == ToolpathEvent::ExtruderOn)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(on_indices.len(), 2);

    let expected_shift = jitter_fraction(1) * 2.0 * 0.4;
    let start = lines[on_indices[1] - 1].move_target().unwrap();
    assert!((start.x - expected_shift).abs() < 1e-9);
    assert!(start.y.abs() < 1e-9);
    assert_eq!(start.z, 0.8);

    // the extrusion run closes back on the shifted start
    let off = on_indices[1]
        + lines[on_indices[1]..]
            .iter()
            .position(|l| l.event == ToolpathEvent::ExtruderOff)
            .unwrap();
    assert_eq!(lines[off - 1].move_target(), Some(start));
}

/// One layer of a 20x20 outer loop printed at two feed rates, then a travel
/// without a feed word
fn two_feed_layer(z: f64) -> String {
    let mut text = format!("(<layerStart> {} )\n(<surroundingLoop> )\n", z);
    for (x, y) in [(0, 0), (20, 0), (20, 20), (0, 20)] {
        text.push_str(&format!("(<boundaryPoint> X{} Y{} Z{} )\n", x, y, z));
    }
    text.push_str("(</surroundingLoop> )\n(<perimeter> outer )\n");
    text.push_str(&format!(
        "G1 X0 Y0 Z{z} F1200\nM101\nG1 X20 Y0 Z{z} F600\nG1 X20 Y20 Z{z} F1200\n\
         G1 X0 Y20 Z{z}\nG1 X0 Y0 Z{z}\nM103\n(</perimeter> )\nG1 X50 Y50\n",
        z = z
    ));
    text
}

#[test]
fn test_jitter_restores_feed_rate_after_loop() {
    let text = format!("{}{}", two_feed_layer(0.4), two_feed_layer(0.8));
    let mut lines = StreamParser::new().parse_text(&text);
    let report = CombStage::default().process(&mut lines);
    assert_eq!(report.count("jittered_loops"), 2);

    let out = StreamEmitter::new(3).emit(&lines);
    let last_off = out.rfind("M103\n").unwrap();
    // the shifted seam closes on the F600 edge
    let closing = out[..last_off].lines().last().unwrap();
    assert!(closing.ends_with(" F600"), "{}", closing);
    let next_move = out[last_off..].lines().find(|l| l.starts_with("G1")).unwrap();
    assert!(next_move.ends_with(" F1200"), "{}", next_move);
}

#[test]
fn test_back_to_back_runs_share_no_travel() {
    let text = "(<layerStart> 0.4 )\n\
                (<perimeter> outer )\n\
                G1 X0 Y0 Z0.4 F1200\n\
                M101\n\
                G1 X20 Y0 Z0.4\n\
                G1 X20 Y20 Z0.4\n\
                G1 X0 Y20 Z0.4\n\
                G1 X0 Y0 Z0.4\n\
                M103\n\
                M101\n\
                G1 X20 Y0 Z0.4\n\
                G1 X20 Y20 Z0.4\n\
                G1 X0 Y20 Z0.4\n\
                G1 X0 Y0 Z0.4\n\
                M103\n\
                (</perimeter> )";
    let mut lines = StreamParser::new().parse_text(text);
    let report = CombStage::default().process(&mut lines);
    assert_eq!(report.count("jittered_loops"), 1);

    let on_indices: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.event == ToolpathEvent::ExtruderOn)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(on_indices.len(), 2);
    let second_run = &lines[on_indices[1] + 1..on_indices[1] + 5];
    assert!(second_run.iter().all(|l| !l.is_synthesized()));
    assert_eq!(lines[on_indices[1] + 5].event, ToolpathEvent::ExtruderOff);
}

#[test]
fn test_jitter_is_deterministic() {
    let parsed = StreamParser::new().parse_text(&perimeter_stream());
    let mut first = parsed.clone();
    let mut second = parsed;
    CombStage::default().process(&mut first);
    CombStage::default().process(&mut second);
    assert_eq!(first, second);
}

proptest! {
    #[test]
    fn prop_travel_clear_of_corridors_is_untouched(
        x1 in -20.0f64..30.0,
        y1 in 12.0f64..30.0,
        x2 in -20.0f64..30.0,
        y2 in 12.0f64..30.0,
    ) {
        let store = hole_store();
        let parameters = CombParameters::default();
        let (path, _) = route(&store, &parameters, Point3::new(x1, y1, Z), Point3::new(x2, y2, Z), 1.0);
        prop_assert!(path.is_empty());
    }

    #[test]
    fn prop_detour_takes_shorter_side(y in 0.5f64..9.5, x1 in -6.0f64..-1.0, x2 in 11.0f64..16.0) {
        let store = hole_store();
        let parameters = CombParameters::default();
        let from = Point3::new(x1, y, Z);
        let to = Point3::new(x2, y, Z);
        let (path, _) = route(&store, &parameters, from, to, 1.0);

        prop_assert!(!path.is_empty());
        prop_assert!(path.iter().all(|p| !strictly_inside_hole(*p)));

        let hole: Vec<Point2> = [(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]
            .iter()
            .map(|&(x, y)| Point2::new(x, y))
            .collect();
        let corridors = corridors_for_loop(LoopId(0), &hole, 1.0).unwrap();
        let mut travel = vec![from.xy()];
        travel.extend(path.iter().map(|p| p.xy()));
        travel.push(to.xy());
        prop_assert!(!crosses_loop(&travel, &hole));
        for corridor in &corridors {
            prop_assert!(!crosses_loop(&travel, &corridor.points));
        }

        // corridor is the 11 x 11 square around the hole with rounded corners
        let half_corridor = 0.5 * 4.0 * 11.0;
        let straight = from.distance(to);
        prop_assert!(travel_length(from, &path, to) <= straight + half_corridor + 1e-6);
    }
}
