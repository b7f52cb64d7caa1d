//! One placement run: blueprint → search → reasoning → graph update → overlay → files.

use crate::blueprint::{Blueprint, BlueprintError, load_blueprint};
use crate::config::Config;
use crate::event::{EventInsertion, add_event};
use crate::fonts;
use crate::geometry::{cell_in_grid, grid_to_pixel};
use crate::layout::compute_layout;
use crate::layout_dump::write_layout_dump;
use crate::output::{OutputPaths, explanation_document};
use crate::overlay::OverlayRenderer;
use crate::placement::PlacementDecision;
use crate::reasoning::{
    GeminiClient, ReasoningError, ReasoningProvider, blueprint_context, request_placement,
};
use crate::render::{ImageError, render_svg, save_png, svg_options, write_output_png, write_output_svg};
use crate::search::{DuckDuckGoClient, SearchError, SearchProvider, summarize_search};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Blueprint(#[from] BlueprintError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Reasoning(#[from] ReasoningError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EventRequest {
    pub event: String,
    /// Replaces the model's grid cell when set.
    pub position_override: Option<(i64, i64)>,
}

#[derive(Debug, Clone)]
pub struct PlacementReport {
    pub insertion: EventInsertion,
    pub decision: PlacementDecision,
    pub pixel: (i64, i64),
    pub search_summary: String,
    pub paths: OutputPaths,
    /// Blueprint including the new event node.
    pub blueprint: Blueprint,
}

/// Runs one placement with the given collaborators and writes both outputs
/// under `config.paths.output_dir`, named by `timestamp`.
pub fn place_event<S, R>(
    config: &Config,
    request: &EventRequest,
    search: &S,
    reasoning: &R,
    timestamp: &str,
) -> Result<PlacementReport, PipelineError>
where
    S: SearchProvider + ?Sized,
    R: ReasoningProvider + ?Sized,
{
    let event = request.event.as_str();
    let mut blueprint = load_blueprint(&config.paths.blueprint)?;

    info!(event, "searching");
    let search_summary = summarize_search(search, event, config.search.max_results);

    let context = blueprint_context(&blueprint.labels, config.reasoning.max_context_nodes);
    let mut decision = request_placement(reasoning, event, &search_summary, &context, config.grid)?;
    if let Some((col, row)) = request.position_override {
        info!(col, row, "using position override");
        decision = decision.with_position(col, row);
    }
    if !cell_in_grid(decision.grid_col, decision.grid_row, config.grid.cols, config.grid.rows) {
        warn!(
            col = decision.grid_col,
            row = decision.grid_row,
            cols = config.grid.cols,
            rows = config.grid.rows,
            "grid position outside the grid, marker may fall off the image"
        );
    }

    let insertion = add_event(&mut blueprint, event, &decision);

    let renderer = OverlayRenderer::new(&config.overlay, &config.theme);
    let mut image = renderer.load_base_image(&config.paths.base_image)?;
    let pixel = grid_to_pixel(
        decision.grid_col,
        decision.grid_row,
        image.width(),
        image.height(),
        config.grid.cols,
        config.grid.rows,
    );
    renderer.overlay(&mut image, pixel.0, pixel.1, &decision.label)?;

    let dir = &config.paths.output_dir;
    std::fs::create_dir_all(dir).map_err(|source| PipelineError::Output {
        path: dir.clone(),
        source,
    })?;
    let paths = OutputPaths::new(dir, timestamp);
    save_png(&image, &paths.image)?;
    let document = explanation_document(event, &decision, &insertion, &search_summary);
    std::fs::write(&paths.explanation, document).map_err(|source| PipelineError::Output {
        path: paths.explanation.clone(),
        source,
    })?;
    info!(
        image = %paths.image.display(),
        explanation = %paths.explanation.display(),
        x = pixel.0,
        y = pixel.1,
        "placement saved"
    );

    Ok(PlacementReport {
        insertion,
        decision,
        pixel,
        search_summary,
        paths,
        blueprint,
    })
}

/// [`place_event`] against DuckDuckGo and Gemini. Fails on a missing
/// credential before anything touches the network.
pub fn run_pipeline(
    config: &Config,
    request: &EventRequest,
    timestamp: &str,
) -> Result<PlacementReport, PipelineError> {
    let reasoning = GeminiClient::new(&config.reasoning, config.api_key.as_ref())?;
    let search = DuckDuckGoClient::new(&config.search)?;
    place_event(config, request, &search, &reasoning, timestamp)
}

/// Lays out and renders the whole graph. `.svg` outputs are written as SVG,
/// anything else as PNG.
pub fn render_graph(
    blueprint: &Blueprint,
    config: &Config,
    output: &Path,
    dump: Option<&Path>,
) -> anyhow::Result<()> {
    let layout = compute_layout(&blueprint.graph, &config.theme, &config.layout, &config.render);
    let db = fonts::load_font_database(&config.overlay.font_files);
    let font = fonts::resolve_family(&db, &config.overlay.font_families);
    let svg = render_svg(&layout, &config.theme, &config.render, &font);

    let is_svg = output
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if is_svg {
        write_output_svg(&svg, output)?;
    } else {
        write_output_png(&svg, output, &svg_options(Arc::new(db), &font))?;
    }
    if let Some(path) = dump {
        write_layout_dump(path, &layout)?;
    }
    info!(
        output = %output.display(),
        nodes = blueprint.graph.node_count(),
        edges = blueprint.graph.edge_count(),
        "graph rendered"
    );
    Ok(())
}
