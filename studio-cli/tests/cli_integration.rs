//! End-to-end tests for the command-line host.

use clap::Parser;
use studio_cli::{load_project, run, CliArgs};
use studio_core::{Color, Layer, LayerKind, PixelBuffer, Project, RasterLayer};

fn args(list: &[&str]) -> CliArgs {
    let mut argv = vec!["cake-studio"];
    argv.extend_from_slice(list);
    CliArgs::try_parse_from(argv).expect("args")
}

fn write_project(dir: &std::path::Path) -> std::path::PathBuf {
    let mut project = Project::new(40, 30, 100.0).expect("project");
    let pixels = PixelBuffer::filled(40, 30, Color::rgb(90, 40, 200)).expect("pixels");
    project.insert_layer(Layer::new(
        "base",
        LayerKind::Raster(RasterLayer::from_pixels(pixels)),
    ));
    let path = dir.join("cake.json");
    std::fs::write(&path, project.to_json().expect("json")).expect("write project");
    path
}

// ==========================================================================
// Project files
// ==========================================================================

#[test]
fn test_new_from_preset_writes_loadable_project() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("round.json");
    let out_str = out.to_str().expect("utf8 path");

    let written = run(args(&["new", "--preset", "round-8", "-o", out_str]))
        .expect("run")
        .expect("path");
    assert_eq!(written, out);

    let project = load_project(&out).expect("load");
    assert_eq!((project.width, project.height), (2250, 2250));
    assert!(project.is_empty());
}

#[test]
fn test_new_rejects_unknown_preset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("x.json");
    let result = run(args(&[
        "new",
        "--preset",
        "wedding-tier",
        "-o",
        out.to_str().expect("utf8 path"),
    ]));
    assert!(result.is_err());
    assert!(!out.exists());
}

#[test]
fn test_load_project_reports_bad_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").expect("write");
    let err = load_project(&path).expect_err("invalid");
    assert!(format!("{err:#}").contains("invalid project file"));
}

// ==========================================================================
// Render and print
// ==========================================================================

#[test]
fn test_render_crop_to_png() {
    let dir = tempfile::tempdir().expect("tempdir");
    let project = write_project(dir.path());
    let out = dir.path().join("cake.png");

    run(args(&[
        "render",
        project.to_str().expect("utf8 path"),
        "-o",
        out.to_str().expect("utf8 path"),
        "--crop",
        "5,5,10,8",
    ]))
    .expect("render");

    let bytes = std::fs::read(&out).expect("output");
    let decoded = tiny_skia::Pixmap::decode_png(&bytes).expect("png");
    assert_eq!((decoded.width(), decoded.height()), (10, 8));
}

#[test]
fn test_print_to_jpeg_by_extension() {
    let dir = tempfile::tempdir().expect("tempdir");
    let project = write_project(dir.path());
    let out = dir.path().join("print.jpeg");

    run(args(&[
        "print",
        project.to_str().expect("utf8 path"),
        "-o",
        out.to_str().expect("utf8 path"),
        "--soft-proof",
    ]))
    .expect("print");

    let bytes = std::fs::read(&out).expect("output");
    assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
}

#[test]
fn test_missing_font_file_fails_with_context() {
    let dir = tempfile::tempdir().expect("tempdir");
    let project = write_project(dir.path());
    let out = dir.path().join("cake.png");
    let err = run(args(&[
        "--font",
        "Script=/nonexistent/script.ttf",
        "render",
        project.to_str().expect("utf8 path"),
        "-o",
        out.to_str().expect("utf8 path"),
    ]))
    .expect_err("missing font");
    assert!(format!("{err:#}").contains("failed to read font"));
}
