//! Editing Integration Tests
//!
//! Drives the editor through pointer events the way a host would:
//! - Undo / redo linearity across gestures
//! - Selection clipping of paint tools
//! - Magic wand through the background worker
//! - Grid snapping of moved layers

use proptest::prelude::*;
use studio_core::{
    Color, Editor, GridConfig, Layer, LayerKind, PixelBuffer, Point, PointerEvent, Project,
    RasterLayer, Selection, ToolKind, Transform,
};

fn blank_editor(width: u32, height: u32) -> Editor {
    let mut editor = Editor::new(Project::new(width, height, 300.0).expect("project"));
    editor
        .state_mut()
        .add_raster_layer("paint")
        .expect("raster layer");
    editor
}

fn drag(editor: &mut Editor, from: (f32, f32), to: (f32, f32)) {
    editor.pointer_down(&PointerEvent::at(from.0, from.1), None);
    editor.pointer_move(&PointerEvent::at(to.0, to.1), None);
    editor.pointer_up(&PointerEvent::at(to.0, to.1), None);
}

fn active_pixels(editor: &Editor) -> PixelBuffer {
    editor
        .state()
        .active_layer()
        .and_then(Layer::as_raster)
        .and_then(RasterLayer::resolve)
        .expect("raster pixels")
        .into_owned()
}

// ============================================================================
// History
// ============================================================================

#[test]
fn test_undo_redo_walks_gestures_in_order() {
    let mut editor = Editor::new(Project::new(200, 200, 300.0).expect("project"));
    editor.set_tool(ToolKind::Marquee);

    let mut seen: Vec<Selection> = vec![editor.state().selection().clone()];
    for i in 0..5_u8 {
        let offset = f32::from(i) * 30.0;
        editor.pointer_down(&PointerEvent::at(offset, offset).with_shift(), None);
        editor.pointer_up(&PointerEvent::at(offset + 20.0, offset + 20.0), None);
        seen.push(editor.state().selection().clone());
    }

    for expected in seen.iter().rev().skip(1) {
        assert!(editor.undo());
        assert_eq!(editor.state().selection(), expected);
    }
    assert!(!editor.undo(), "undo past the oldest checkpoint is a no-op");

    for expected in seen.iter().skip(1) {
        assert!(editor.redo());
        assert_eq!(editor.state().selection(), expected);
    }
    assert!(!editor.redo());
}

#[test]
fn test_new_gesture_discards_redo() {
    let mut editor = blank_editor(100, 100);
    editor.set_tool(ToolKind::Brush);
    drag(&mut editor, (10.0, 10.0), (40.0, 10.0));
    drag(&mut editor, (10.0, 50.0), (40.0, 50.0));
    assert!(editor.undo());
    assert!(editor.state().can_redo());

    drag(&mut editor, (10.0, 80.0), (40.0, 80.0));
    assert!(!editor.state().can_redo());
    let labels: Vec<&str> = editor.state().history().labels().collect();
    assert_eq!(labels, ["Add Layer", "Brush Stroke", "Brush Stroke"]);
}

// ============================================================================
// Paint clipping
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_brush_never_paints_outside_selection(
        sx in 0_u8..48,
        sy in 0_u8..48,
        sw in 1_u8..16,
        sh in 1_u8..16,
        x0 in 0.0_f32..64.0,
        y0 in 0.0_f32..64.0,
        x1 in 0.0_f32..64.0,
        y1 in 0.0_f32..64.0,
    ) {
        let mut editor = blank_editor(64, 64);
        let rect = studio_core::Polygon::rect(
            f32::from(sx),
            f32::from(sy),
            f32::from(sw),
            f32::from(sh),
        );
        let selection = Selection::new().add(rect);
        editor.state_mut().set_selection(selection.clone());
        editor.state_mut().paint.brush_size = 9.0;
        editor.set_tool(ToolKind::Brush);
        drag(&mut editor, (x0, y0), (x1, y1));

        let pixels = active_pixels(&editor);
        for y in 0..64_u32 {
            for x in 0..64_u32 {
                #[allow(clippy::cast_precision_loss)]
                let centre = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                if !selection.contains(centre) {
                    let c = pixels.color_at(x, y).expect("in bounds");
                    prop_assert_eq!(c.a, 0, "pixel ({}, {}) painted outside selection", x, y);
                }
            }
        }
    }
}

// ============================================================================
// Magic wand
// ============================================================================

#[test]
fn test_wand_selects_square_on_transparent_layer() {
    let mut project = Project::new(100, 100, 300.0).expect("project");
    let mut rgba = vec![0_u8; 100 * 100 * 4];
    for y in 25..75 {
        for x in 25..75 {
            let i = (y * 100 + x) * 4;
            rgba[i..i + 4].copy_from_slice(&[250, 200, 210, 255]);
        }
    }
    let pixels = PixelBuffer::from_rgba(100, 100, &rgba).expect("pixels");
    project.insert_layer(Layer::new(
        "frosting",
        LayerKind::Raster(RasterLayer::from_pixels(pixels)),
    ));

    let mut editor = Editor::new(project);
    editor.set_tool(ToolKind::Wand);
    editor.pointer_down(&PointerEvent::at(50.0, 50.0), None);
    editor.pointer_up(&PointerEvent::at(50.0, 50.0), None);
    assert!(editor.state().pending_region_grow().is_some());
    assert!(editor.state_mut().wait_background());

    let polygons: Vec<_> = editor.state().selection().polygons().collect();
    assert_eq!(polygons.len(), 1);
    assert!((polygons[0].area() - 2500.0).abs() < 1.0);
    assert_eq!(editor.state().history().undo_label(), Some("Magic Wand"));

    // The selection now clips the brush.
    editor.state_mut().paint.primary = Color::rgb(20, 20, 20);
    editor.set_tool(ToolKind::Brush);
    drag(&mut editor, (0.0, 50.0), (99.0, 50.0));
    let painted = active_pixels(&editor);
    assert_eq!(painted.color_at(10, 50).map(|c| c.a), Some(0));
    assert_eq!(painted.color_at(50, 50), Some(Color::rgb(20, 20, 20)));
}

#[test]
fn test_wand_on_transparent_seed_keeps_selection() {
    let mut editor = blank_editor(40, 40);
    editor.set_tool(ToolKind::Wand);
    editor.pointer_down(&PointerEvent::at(5.0, 5.0), None);
    editor.state_mut().wait_background();
    assert!(editor.state().selection().is_empty());
    assert_eq!(editor.state().history().undo_label(), Some("Add Layer"));
}

#[tokio::test]
async fn test_poll_applies_result_once() {
    let mut editor = blank_editor(40, 40);
    editor.state_mut().paint.primary = Color::rgb(0, 128, 0);
    editor.state_mut().paint.brush_size = 10.0;
    editor.set_tool(ToolKind::Brush);
    drag(&mut editor, (20.0, 20.0), (20.0, 20.0));

    editor.set_tool(ToolKind::Wand);
    editor.pointer_down(&PointerEvent::at(20.0, 20.0), None);
    let mut applied = false;
    for _ in 0..200 {
        if editor.poll_background() {
            applied = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(applied, "region grow never completed");
    assert!(!editor.poll_background());
    assert!(editor.state().selection().contains(Point::new(20.0, 20.0)));
}

// ============================================================================
// Grid snapping
// ============================================================================

#[test]
fn test_move_snaps_layer_to_grid() {
    let mut editor = blank_editor(400, 400);
    let id = editor.state().active_layer_id().expect("active layer");
    editor.state_mut().grid = GridConfig {
        enabled: true,
        snap_enabled: true,
        ..GridConfig::default()
    };
    editor.set_tool(ToolKind::Move);
    drag(&mut editor, (0.0, 0.0), (107.0, 93.0));

    let layer = editor.state().project().layer(id).expect("layer");
    assert_eq!(layer.transform, Transform::at(100.0, 100.0));
    assert!(editor.undo());
    let layer = editor.state().project().layer(id).expect("layer");
    assert_eq!(layer.transform, Transform::default());
}
