mod config;
mod logging;
mod source;

pub use config::Settings;
pub use source::ImagePageSource;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use doc_model::{Category, Document, PageSummary, Warning};
use geometry::PixelRect;
use overlay_engine::{HitEntry, LegendEntry};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use viewer_core::ViewerSession;

#[derive(Debug, Parser)]
#[command(name = "docai-overlay")]
#[command(about = "Inspect document analysis results and draw them over page images")]
pub struct Cli {
    /// Settings file (defaults to ./docai-overlay.toml when present).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print page and category counts plus parse warnings.
    Inspect {
        #[arg(value_name = "RESULT")]
        result: PathBuf,
    },
    /// Print entities and form fields as name/value rows.
    Fields {
        #[arg(value_name = "RESULT")]
        result: PathBuf,
    },
    /// Print every table as header and body grids.
    Tables {
        #[arg(value_name = "RESULT")]
        result: PathBuf,
    },
    /// Draw the overlay for one page onto its image.
    Render {
        #[arg(value_name = "RESULT")]
        result: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also write the full hit index as JSON.
        #[arg(long, value_name = "JSON")]
        hits: Option<PathBuf>,
    },
    /// Print the tooltip of the top-most item at a pixel of the rendered page.
    Hit {
        #[arg(value_name = "RESULT")]
        result: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
    },
    /// Print category colors in draw order.
    Legend,
    /// Print CLI version.
    Version,
}

#[derive(Debug, Args)]
struct ViewArgs {
    #[arg(long, value_name = "PNG")]
    image: PathBuf,
    #[arg(long, default_value_t = 1)]
    page: usize,
    /// Zoom in percent; defaults to the configured zoom.
    #[arg(long, value_name = "PERCENT")]
    zoom: Option<u16>,
    /// Categories to draw (repeatable); defaults to the configured filters.
    #[arg(long = "filter", value_name = "CATEGORY")]
    filters: Vec<String>,
    #[arg(long)]
    no_labels: bool,
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    page_count: usize,
    item_count: usize,
    pages: Vec<PageSummary>,
    warnings: Vec<Warning>,
}

#[derive(Debug, Serialize)]
struct HitOutput<'a> {
    id: String,
    category: Category,
    label: &'a str,
    tooltip: &'a str,
    rect: PixelRect,
}

impl<'a> From<&'a HitEntry> for HitOutput<'a> {
    fn from(entry: &'a HitEntry) -> Self {
        Self {
            id: entry.item.id.to_string(),
            category: entry.item.category,
            label: &entry.label,
            tooltip: &entry.tooltip,
            rect: entry.rect,
        }
    }
}

#[derive(Debug, Serialize)]
struct RenderReport<'a> {
    output: String,
    width: u32,
    height: u32,
    rotated: bool,
    hits: Vec<HitOutput<'a>>,
    warnings: &'a [Warning],
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let settings = Settings::load(cli.config.as_deref())?;
    logging::init(&settings.log_level);

    match cli.command {
        Commands::Inspect { result } => run_inspect(&result),
        Commands::Fields { result } => {
            let document = load_document(&result)?;
            print_json(&document.formatted_fields())
        }
        Commands::Tables { result } => {
            let document = load_document(&result)?;
            print_json(&document.tables())
        }
        Commands::Render { result, view, output, hits } => {
            run_render(&settings, &result, &view, output.as_deref(), hits.as_deref())
        }
        Commands::Hit { result, view, x, y } => run_hit(&settings, &result, &view, x, y),
        Commands::Legend => print_json::<Vec<LegendEntry>>(&overlay_engine::legend()),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_inspect(result: &Path) -> Result<()> {
    let document = load_document(result)?;

    print_json(&InspectOutput {
        page_count: document.page_count(),
        item_count: document.item_count(),
        pages: document.page_summaries(),
        warnings: document.diagnostics().warnings().to_vec(),
    })
}

fn run_render(
    settings: &Settings,
    result: &Path,
    view: &ViewArgs,
    output: Option<&Path>,
    hits: Option<&Path>,
) -> Result<()> {
    let (mut session, source) = open_view(settings, result, view)?;
    let rendered = session.render(&source).context("failed to render overlay")?;

    let output = output
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_overlay_output(&view.image, view.page));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    rendered
        .image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    if let Some(path) = hits {
        let json = serde_json::to_string_pretty(&rendered.hits)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write hit index to {}", path.display()))?;
    }

    let (width, height) = rendered.image.dimensions();
    print_json(&RenderReport {
        output: output.display().to_string(),
        width,
        height,
        rotated: rendered.rotated,
        hits: rendered.hits.iter().map(HitOutput::from).collect(),
        warnings: rendered.diagnostics.warnings(),
    })
}

fn run_hit(settings: &Settings, result: &Path, view: &ViewArgs, x: f64, y: f64) -> Result<()> {
    let (mut session, source) = open_view(settings, result, view)?;
    session.render(&source).context("failed to render overlay")?;

    let hit = session.hover(x, y).map(HitOutput::from);
    print_json(&hit)
}

fn open_view(
    settings: &Settings,
    result: &Path,
    view: &ViewArgs,
) -> Result<(ViewerSession, ImagePageSource)> {
    if view.page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }
    let document = load_document(result)?;
    ensure_file_exists(&view.image)?;

    let page_index = view.page - 1;
    let source = ImagePageSource::open(page_index, &view.image)?;

    let filters = if view.filters.is_empty() {
        settings.filter_set()?
    } else {
        config::parse_filters(&view.filters)?
    };

    let mut session = ViewerSession::new(Arc::new(document));
    if page_index >= session.page_count() {
        anyhow::bail!(
            "page {} out of range (page_count={})",
            view.page,
            session.page_count()
        );
    }
    session.set_page(page_index);
    session.set_zoom_percent(view.zoom.unwrap_or(settings.default_zoom_percent));
    session.set_filters(filters);
    session.set_show_labels(settings.show_labels && !view.no_labels);

    Ok((session, source))
}

fn load_document(path: &Path) -> Result<Document> {
    ensure_file_exists(path)?;

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document = doc_model::parse_slice(&bytes).context("failed to parse analysis result")?;
    for warning in document.diagnostics().warnings() {
        tracing::info!("{warning}");
    }

    Ok(document)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_overlay_output(image: &Path, page: usize) -> PathBuf {
    let stem = image.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    image.with_file_name(format!("{stem}-page-{page}-overlay.png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_beside_the_image() {
        assert_eq!(
            default_overlay_output(Path::new("/scans/invoice.png"), 2),
            PathBuf::from("/scans/invoice-page-2-overlay.png")
        );
    }

    #[test]
    fn view_args_parse_repeated_filters() {
        let cli = Cli::parse_from([
            "docai-overlay",
            "render",
            "result.json",
            "--image",
            "page.png",
            "--filter",
            "tables",
            "--filter",
            "entity",
            "--no-labels",
        ]);

        let Commands::Render { view, .. } = cli.command else {
            panic!("expected render command");
        };
        assert_eq!(view.filters, vec!["tables", "entity"]);
        assert_eq!(view.page, 1);
        assert!(view.no_labels);
        assert!(view.zoom.is_none());
    }
}
