use watermark_engine::layout::*;
use watermark_engine::*;

fn placement(anchor: Anchor, mx: u32, my: u32) -> Placement {
    Placement {
        anchor,
        margin_x: Margin::Px(mx),
        margin_y: Margin::Px(my),
        ..Default::default()
    }
}

fn single(resolved: ResolvedPlacement) -> Position {
    match resolved.origin {
        LayerOrigin::Single(pos) => pos,
        LayerOrigin::Tiled(_) => panic!("expected a single origin"),
    }
}

#[test]
fn test_all_nine_anchors() {
    let canvas = CanvasSize::new(1000, 800);
    let layer = LayerSize::new(200, 100);
    let (mx, my) = (15, 25);

    let expected = [
        (Anchor::TopLeft, (15, 25)),
        (Anchor::TopCenter, (400, 25)),
        (Anchor::TopRight, (785, 25)),
        (Anchor::MiddleLeft, (15, 350)),
        (Anchor::Center, (400, 350)),
        (Anchor::MiddleRight, (785, 350)),
        (Anchor::BottomLeft, (15, 675)),
        (Anchor::BottomCenter, (400, 675)),
        (Anchor::BottomRight, (785, 675)),
    ];

    assert_eq!(expected.len(), Anchor::FIXED.len());
    for (anchor, (x, y)) in expected {
        let resolved = resolve_placement(canvas, layer, layer, &placement(anchor, mx, my));
        assert_eq!(single(resolved), Position::new(x, y), "{anchor:?}");
    }
}

#[test]
fn test_percent_margins() {
    let canvas = CanvasSize::new(1000, 500);
    let layer = LayerSize::new(100, 50);
    let p = Placement {
        anchor: Anchor::BottomRight,
        margin_x: Margin::Percent(10.0),
        margin_y: Margin::Percent(10.0),
        ..Default::default()
    };
    let pos = single(resolve_placement(canvas, layer, layer, &p));
    assert_eq!(pos, Position::new(1000 - 100 - 100, 500 - 50 - 50));
}

#[test]
fn test_oversized_layer_goes_negative() {
    let canvas = CanvasSize::new(100, 100);
    let layer = LayerSize::new(300, 140);
    let pos = single(resolve_placement(
        canvas,
        layer,
        layer,
        &placement(Anchor::Center, 0, 0),
    ));
    assert_eq!(pos, Position::new(-100, -20));

    let pos = single(resolve_placement(
        canvas,
        layer,
        layer,
        &placement(Anchor::BottomRight, 10, 10),
    ));
    assert_eq!(pos, Position::new(-210, -50));
}

#[test]
fn test_tile_count_matches_ceiling() {
    let canvas = CanvasSize::new(1000, 700);
    let layer = LayerSize::new(120, 90);
    let p = Placement {
        anchor: Anchor::Tiled,
        tile_spacing_x: 0,
        tile_spacing_y: 0,
        ..Default::default()
    };
    let resolved = resolve_placement(canvas, layer, layer, &p);
    let LayerOrigin::Tiled(grid) = resolved.origin else {
        panic!("expected tiled origin");
    };
    let expected = 1000usize.div_ceil(120) * 700usize.div_ceil(90);
    assert_eq!(grid.positions().count(), expected);
    assert_eq!(grid.count(), expected);
}

#[test]
fn test_tiled_grid_uses_stamp_size_and_spacing() {
    let canvas = CanvasSize::new(500, 500);
    let natural = LayerSize::new(100, 20);
    let rotated = LayerSize::new(20, 100);
    let p = Placement {
        anchor: Anchor::Tiled,
        rotation_degrees: 90.0,
        tile_spacing_x: 30,
        tile_spacing_y: 25,
        ..Default::default()
    };
    let resolved = resolve_placement(canvas, natural, rotated, &p);
    assert_eq!(resolved.rotation_degrees, 90.0);
    let LayerOrigin::Tiled(grid) = resolved.origin else {
        panic!("expected tiled origin");
    };
    assert_eq!((grid.pitch_x, grid.pitch_y), (50, 125));
    assert_eq!((grid.cols, grid.rows), (10, 4));
}

#[test]
fn test_rotation_is_normalized() {
    let canvas = CanvasSize::new(100, 100);
    let layer = LayerSize::new(10, 10);
    let mut p = placement(Anchor::Center, 0, 0);
    p.rotation_degrees = -30.0;
    assert_eq!(
        resolve_placement(canvas, layer, layer, &p).rotation_degrees,
        330.0
    );
    p.rotation_degrees = 720.0;
    assert_eq!(resolve_placement(canvas, layer, layer, &p).rotation_degrees, 0.0);
}

#[test]
fn test_odd_overhang_floors() {
    let canvas = CanvasSize::new(10, 10);
    let layer = LayerSize::new(15, 15);
    let pos = single(resolve_placement(
        canvas,
        layer,
        layer,
        &placement(Anchor::Center, 0, 0),
    ));
    assert_eq!(pos, Position::new(-3, -3));

    let p = Placement {
        anchor: Anchor::Tiled,
        tile_spacing_x: 0,
        tile_spacing_y: 0,
        ..Default::default()
    };
    let LayerOrigin::Tiled(grid) = resolve_placement(canvas, layer, layer, &p).origin else {
        panic!("expected tiled origin");
    };
    assert_eq!(grid.count(), 1);
    assert_eq!(grid.offset, Position::new(-3, -3));
}

#[test]
fn test_custom_anchor_uses_exact_coordinates() {
    let p = Placement {
        anchor: Anchor::Custom,
        custom_x: 120,
        custom_y: -15,
        ..placement(Anchor::Custom, 40, 40)
    };
    let layer = LayerSize::new(50, 50);
    let pos = single(resolve_placement(CanvasSize::new(400, 300), layer, layer, &p));
    assert_eq!(pos, Position::new(120, -15));
}

#[test]
fn test_custom_anchor_round_trips() {
    let json = r#"{ "anchor": "custom", "custom_x": 12, "custom_y": 34 }"#;
    let p: Placement = serde_json::from_str(json).unwrap();
    assert_eq!(p.anchor, Anchor::Custom);
    assert_eq!((p.custom_x, p.custom_y), (12, 34));
}
