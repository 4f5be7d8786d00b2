//! # Cake Studio CLI
//!
//! Headless host for Cake Studio project files.
//!
//! ## Usage
//!
//! ```bash
//! cake-studio presets
//! cake-studio new --preset quarter-sheet -o cake.json
//! cake-studio --font "Pacifico:400=fonts/Pacifico.ttf" render cake.json -o cake.png
//! cake-studio print cake.json --format pdf -o cake-print.pdf
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use studio_core::{find_preset, CropFrame, PrintSettings, Project, PRINT_PRESETS};
use studio_renderer::{
    Compositor, ExportBlob, ExportConfig, ExportFormat, FontBook, OutputKind, PrintOptions,
    ProjectExporter,
};
use tracing::info;

/// Command-line arguments for cake-studio.
#[derive(Debug, Clone, Parser)]
#[command(name = "cake-studio")]
#[command(about = "Render, export and print Cake Studio projects")]
#[command(version)]
pub struct CliArgs {
    /// Register a font: `family[:weight]=path` (repeatable)
    #[arg(long = "font", global = true, value_name = "SPEC")]
    pub fonts: Vec<FontSpec>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Export the canvas content
    Render(RenderArgs),
    /// Export a print-ready render with bleed and crop marks
    Print(PrintArgs),
    /// List the built-in print presets
    Presets {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write an empty project file sized from a preset or explicit dimensions
    New(NewArgs),
}

/// Arguments for `render`.
#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Project JSON file
    pub project: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format (png, jpeg, pdf); defaults to the output extension
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Crop frame `x,y,width,height` in canvas pixels
    #[arg(long, value_parser = parse_crop)]
    pub crop: Option<CropFrame>,

    /// JPEG quality (1-100)
    #[arg(long, env = "CAKE_STUDIO_JPEG_QUALITY", default_value_t = studio_renderer::CONTENT_JPEG_QUALITY)]
    pub quality: u8,
}

/// Arguments for `print`.
#[derive(Debug, Clone, Args)]
pub struct PrintArgs {
    /// Project JSON file
    pub project: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format (png, jpeg, pdf); defaults to the output extension
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Use a preset's bleed and margin instead of the project's
    #[arg(long)]
    pub preset: Option<String>,

    /// Render the trim box only
    #[arg(long)]
    pub no_bleed: bool,

    /// Omit crop marks
    #[arg(long)]
    pub no_marks: bool,

    /// Apply the edible-ink soft proof
    #[arg(long)]
    pub soft_proof: bool,

    /// Output scale factor
    #[arg(long, default_value_t = 1.0)]
    pub scale: f32,
}

/// Arguments for `new`.
#[derive(Debug, Clone, Args)]
pub struct NewArgs {
    /// Preset id (see `presets`)
    #[arg(long, conflicts_with_all = ["width", "height"])]
    pub preset: Option<String>,

    /// Canvas width in pixels
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Canvas height in pixels
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Canvas resolution
    #[arg(long, default_value_t = 300.0)]
    pub dpi: f64,

    /// Output project file
    #[arg(short, long)]
    pub output: PathBuf,
}

/// A `--font family[:weight]=path` registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSpec {
    /// Font family name.
    pub family: String,
    /// CSS-style weight, 400 when omitted.
    pub weight: u16,
    /// Font file.
    pub path: PathBuf,
}

impl FromStr for FontSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (face, path) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected family[:weight]=path, got {s:?}"))?;
        let (family, weight) = match face.rsplit_once(':') {
            Some((family, weight)) => (
                family,
                weight
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid font weight {weight:?}"))?,
            ),
            None => (face, 400),
        };
        let family = family.trim();
        if family.is_empty() || path.trim().is_empty() {
            bail!("expected family[:weight]=path, got {s:?}");
        }
        Ok(Self {
            family: family.to_string(),
            weight,
            path: PathBuf::from(path.trim()),
        })
    }
}

fn parse_crop(s: &str) -> anyhow::Result<CropFrame> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid crop frame {s:?}"))?;
    let [x, y, width, height] = parts[..] else {
        bail!("crop frame needs x,y,width,height, got {s:?}");
    };
    Ok(CropFrame {
        x,
        y,
        width,
        height,
    })
}

/// Build a font registry from `--font` arguments.
///
/// # Errors
///
/// Returns an error if a font file cannot be read or parsed.
pub fn load_fonts(specs: &[FontSpec]) -> anyhow::Result<FontBook> {
    let mut book = FontBook::new();
    for spec in specs {
        let bytes = fs::read(&spec.path)
            .with_context(|| format!("failed to read font {}", spec.path.display()))?;
        book.register(&spec.family, spec.weight, bytes)
            .with_context(|| format!("failed to register font {}", spec.path.display()))?;
    }
    Ok(book)
}

/// Load and validate a project file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid project.
pub fn load_project(path: &Path) -> anyhow::Result<Project> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read project {}", path.display()))?;
    let project = Project::from_json(&json)
        .with_context(|| format!("invalid project file {}", path.display()))?;
    info!(
        path = %path.display(),
        width = project.width,
        height = project.height,
        layers = project.layer_count(),
        "Project loaded"
    );
    Ok(project)
}

fn resolve_format(explicit: Option<ExportFormat>, output: &Path) -> anyhow::Result<ExportFormat> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("cannot infer format from {}; pass --format", output.display()))?;
    ext.parse()
        .with_context(|| format!("cannot infer format from {}", output.display()))
}

fn write_blob(blob: &ExportBlob, output: &Path) -> anyhow::Result<PathBuf> {
    // A PDF request can come back as a print-view document.
    let path = if blob.kind == OutputKind::PrintHtml {
        output.with_extension(blob.kind.extension())
    } else {
        output.to_path_buf()
    };
    fs::write(&path, &blob.bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), kind = %blob.kind, bytes = blob.bytes.len(), "Output written");
    Ok(path)
}

/// Run a parsed command line. Returns the path written, if any.
///
/// # Errors
///
/// Returns an error if loading, rendering or writing fails.
pub fn run(args: CliArgs) -> anyhow::Result<Option<PathBuf>> {
    match args.command {
        Command::Render(render) => {
            let project = load_project(&render.project)?;
            let format = resolve_format(render.format, &render.output)?;
            let config = ExportConfig {
                jpeg_quality: render.quality,
                crop: render.crop,
                ..ExportConfig::default()
            };
            let exporter = ProjectExporter::new(Compositor::new(load_fonts(&args.fonts)?), config);
            let blob = exporter
                .export(&project, format)
                .context("export failed")?;
            write_blob(&blob, &render.output).map(Some)
        }
        Command::Print(print) => {
            let project = load_project(&print.project)?;
            let format = resolve_format(print.format, &print.output)?;
            let mut settings = match &print.preset {
                Some(id) => PrintSettings::from_preset(
                    find_preset(id).ok_or_else(|| anyhow!("unknown preset {id:?}"))?,
                ),
                None => project.print,
            };
            settings.soft_proof |= print.soft_proof;
            let options = PrintOptions {
                include_bleed: !print.no_bleed,
                include_marks: !print.no_marks,
                scale: print.scale,
            };
            let exporter = ProjectExporter::new(
                Compositor::new(load_fonts(&args.fonts)?),
                ExportConfig::default(),
            );
            let blob = exporter
                .export_print(&project, &settings, &options, format)
                .context("print export failed")?;
            write_blob(&blob, &print.output).map(Some)
        }
        Command::Presets { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(PRINT_PRESETS)?);
            } else {
                for preset in PRINT_PRESETS {
                    let (w, h) = preset.pixel_size();
                    println!(
                        "{:<20} {:<24} {:>6} x {:<6} {:?} @ {} dpi  ({w}x{h} px)",
                        preset.id, preset.name, preset.width, preset.height, preset.unit, preset.dpi
                    );
                }
            }
            Ok(None)
        }
        Command::New(new) => {
            let project = match (&new.preset, new.width, new.height) {
                (Some(id), _, _) => Project::from_preset(
                    find_preset(id).ok_or_else(|| anyhow!("unknown preset {id:?}"))?,
                )?,
                (None, Some(width), Some(height)) => Project::new(width, height, new.dpi)?,
                _ => bail!("pass --preset or both --width and --height"),
            };
            fs::write(&new.output, project.to_json()?)
                .with_context(|| format!("failed to write {}", new.output.display()))?;
            info!(path = %new.output.display(), width = project.width, height = project.height, "Project created");
            Ok(Some(new.output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_spec_parsing() {
        let spec: FontSpec = "Pacifico:700=fonts/p.ttf".parse().expect("spec");
        assert_eq!(spec.family, "Pacifico");
        assert_eq!(spec.weight, 700);
        assert_eq!(spec.path, PathBuf::from("fonts/p.ttf"));

        let plain: FontSpec = "Open Sans=/tmp/os.ttf".parse().expect("spec");
        assert_eq!(plain.weight, 400);

        assert!("nopath".parse::<FontSpec>().is_err());
        assert!("Bad:heavy=x.ttf".parse::<FontSpec>().is_err());
        assert!("=x.ttf".parse::<FontSpec>().is_err());
    }

    #[test]
    fn test_crop_parsing() {
        let crop = parse_crop("10, 20,300,400").expect("crop");
        assert_eq!((crop.x, crop.y, crop.width, crop.height), (10, 20, 300, 400));
        assert!(parse_crop("1,2,3").is_err());
        assert!(parse_crop("a,b,c,d").is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            resolve_format(None, Path::new("out/cake.JPG")).expect("format"),
            ExportFormat::Jpeg
        );
        assert_eq!(
            resolve_format(Some(ExportFormat::Png), Path::new("cake.pdf")).expect("format"),
            ExportFormat::Png
        );
        assert!(resolve_format(None, Path::new("cake")).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = CliArgs::try_parse_from([
            "cake-studio",
            "--font",
            "Script=a.ttf",
            "print",
            "cake.json",
            "-o",
            "cake.png",
            "--no-marks",
            "--scale",
            "2",
        ])
        .expect("args");
        assert_eq!(args.fonts.len(), 1);
        let Command::Print(print) = args.command else {
            panic!("expected print");
        };
        assert!(print.no_marks);
        assert!(!print.no_bleed);
        assert!((print.scale - 2.0).abs() < f32::EPSILON);
    }
}
