use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// API credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Blank keys count as missing.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() { None } else { Some(Self(value)) }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub blueprint: PathBuf,
    pub base_image: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            blueprint: PathBuf::from("blueprint.json"),
            base_image: PathBuf::from("blueprint.png"),
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub cols: u32,
    pub rows: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { cols: 12, rows: 12 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub endpoint: String,
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DUCKDUCKGO_ENDPOINT.to_string(),
            max_results: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_context_nodes: usize,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            endpoint: GEMINI_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
            max_context_nodes: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub dpi: f32,
    pub marker_radius: f32,
    pub marker_stroke_width: f32,
    pub label_gap: f32,
    pub font_size: f32,
    /// Tried in order before the built-in CJK fallback list.
    pub font_families: Vec<String>,
    /// Extra font files loaded into the font database when present.
    pub font_files: Vec<PathBuf>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            dpi: 150.0,
            marker_radius: 8.0,
            marker_stroke_width: 2.0,
            label_gap: 4.0,
            font_size: 14.0,
            font_families: Vec::new(),
            font_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub seed: u64,
    /// Optimal node distance in the unit layout space.
    pub optimal_distance: f64,
    pub iterations: usize,
    pub node_radius: f32,
    pub margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            optimal_distance: 2.0,
            iterations: 50,
            node_radius: 9.0,
            margin: 24.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
    pub edge_opacity: f32,
    pub edge_width: f32,
    pub node_opacity: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1440.0,
            background: "#FFFFFF".to_string(),
            edge_opacity: 0.5,
            edge_width: 0.5,
            node_opacity: 0.9,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub paths: PathsConfig,
    pub grid: GridConfig,
    pub search: SearchConfig,
    pub reasoning: ReasoningConfig,
    pub overlay: OverlayConfig,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub theme: Theme,
    pub api_key: Option<ApiKey>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().parse::<f64>().ok(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PathsConfigFile {
    blueprint: Option<PathBuf>,
    base_image: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GridConfigFile {
    cols: Option<u32>,
    rows: Option<u32>,
    size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SearchConfigFile {
    endpoint: Option<String>,
    max_results: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ReasoningConfigFile {
    endpoint: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_context_nodes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct OverlayConfigFile {
    dpi: Option<NumberOrString>,
    marker_radius: Option<f32>,
    marker_stroke_width: Option<f32>,
    label_gap: Option<f32>,
    font_size: Option<f32>,
    font_families: Option<Vec<String>>,
    font_files: Option<Vec<PathBuf>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    seed: Option<u64>,
    optimal_distance: Option<f64>,
    iterations: Option<usize>,
    node_radius: Option<f32>,
    margin: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_size: Option<f32>,
    background: Option<String>,
    text_color: Option<String>,
    line_color: Option<String>,
    node_border: Option<String>,
    theme_color: Option<String>,
    concept_color: Option<String>,
    movement_color: Option<String>,
    political_color: Option<String>,
    digital_color: Option<String>,
    other_color: Option<String>,
    marker_fill: Option<String>,
    marker_border: Option<String>,
    marker_label: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    paths: Option<PathsConfigFile>,
    grid: Option<GridConfigFile>,
    search: Option<SearchConfigFile>,
    reasoning: Option<ReasoningConfigFile>,
    overlay: Option<OverlayConfigFile>,
    layout: Option<LayoutConfigFile>,
}

/// Loads defaults, then applies the optional camelCase JSON file on top.
/// Credentials are never read from the file.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "monochrome" {
            config.theme = Theme::monochrome();
        } else if theme_name == "default" || theme_name == "blueprint" {
            config.theme = Theme::blueprint_default();
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.node_border {
            config.theme.node_border = v;
        }
        if let Some(v) = vars.theme_color {
            config.theme.theme_color = v;
        }
        if let Some(v) = vars.concept_color {
            config.theme.concept_color = v;
        }
        if let Some(v) = vars.movement_color {
            config.theme.movement_color = v;
        }
        if let Some(v) = vars.political_color {
            config.theme.political_color = v;
        }
        if let Some(v) = vars.digital_color {
            config.theme.digital_color = v;
        }
        if let Some(v) = vars.other_color {
            config.theme.other_color = v;
        }
        if let Some(v) = vars.marker_fill {
            config.theme.marker_fill = v;
        }
        if let Some(v) = vars.marker_border {
            config.theme.marker_border = v;
        }
        if let Some(v) = vars.marker_label {
            config.theme.marker_label = v;
        }
    }

    if let Some(paths) = parsed.paths {
        if let Some(v) = paths.blueprint {
            config.paths.blueprint = v;
        }
        if let Some(v) = paths.base_image {
            config.paths.base_image = v;
        }
        if let Some(v) = paths.output_dir {
            config.paths.output_dir = v;
        }
    }

    if let Some(grid) = parsed.grid {
        if let Some(v) = grid.size {
            config.grid.cols = v;
            config.grid.rows = v;
        }
        if let Some(v) = grid.cols {
            config.grid.cols = v;
        }
        if let Some(v) = grid.rows {
            config.grid.rows = v;
        }
    }

    if let Some(search) = parsed.search {
        if let Some(v) = search.endpoint {
            config.search.endpoint = v;
        }
        if let Some(v) = search.max_results {
            config.search.max_results = v;
        }
        if let Some(v) = search.timeout_secs {
            config.search.timeout_secs = v;
        }
    }

    if let Some(reasoning) = parsed.reasoning {
        if let Some(v) = reasoning.endpoint {
            config.reasoning.endpoint = v;
        }
        if let Some(v) = reasoning.model {
            config.reasoning.model = v;
        }
        if let Some(v) = reasoning.timeout_secs {
            config.reasoning.timeout_secs = v;
        }
        if let Some(v) = reasoning.max_context_nodes {
            config.reasoning.max_context_nodes = v;
        }
    }

    if let Some(overlay) = parsed.overlay {
        if let Some(v) = overlay.dpi.as_ref().and_then(NumberOrString::as_f64) {
            config.overlay.dpi = v as f32;
        }
        if let Some(v) = overlay.marker_radius {
            config.overlay.marker_radius = v;
        }
        if let Some(v) = overlay.marker_stroke_width {
            config.overlay.marker_stroke_width = v;
        }
        if let Some(v) = overlay.label_gap {
            config.overlay.label_gap = v;
        }
        if let Some(v) = overlay.font_size {
            config.overlay.font_size = v;
        }
        if let Some(v) = overlay.font_families {
            config.overlay.font_families = v;
        }
        if let Some(v) = overlay.font_files {
            config.overlay.font_files = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.seed {
            config.layout.seed = v;
        }
        if let Some(v) = layout.optimal_distance {
            config.layout.optimal_distance = v;
        }
        if let Some(v) = layout.iterations {
            config.layout.iterations = v;
        }
        if let Some(v) = layout.node_radius {
            config.layout.node_radius = v;
        }
        if let Some(v) = layout.margin {
            config.layout.margin = v;
        }
        if let Some(v) = layout.width {
            config.render.width = v;
        }
        if let Some(v) = layout.height {
            config.render.height = v;
        }
    }

    config.render.background = config.theme.background.clone();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_blueprint_grid() {
        let config = load_config(None).unwrap();
        assert_eq!(config.grid, GridConfig { cols: 12, rows: 12 });
        assert_eq!(config.reasoning.model, DEFAULT_MODEL);
        assert_eq!(config.reasoning.max_context_nodes, 80);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.overlay.dpi, 150.0);
        assert_eq!(config.layout.seed, 42);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let config = parse_config(
            r##"{
                "theme": "monochrome",
                "themeVariables": {"markerFill": "#FF0000"},
                "paths": {"outputDir": "out"},
                "grid": {"size": 10, "rows": 8},
                "reasoning": {"model": "gemini-2.5-pro", "timeoutSecs": 60},
                "overlay": {"dpi": "200", "fontFamilies": ["Noto Sans TC"]},
                "layout": {"seed": 7, "width": 800}
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.concept_color, "#5A5A5A");
        assert_eq!(config.theme.marker_fill, "#FF0000");
        assert_eq!(config.paths.output_dir, PathBuf::from("out"));
        assert_eq!(config.grid, GridConfig { cols: 10, rows: 8 });
        assert_eq!(config.reasoning.model, "gemini-2.5-pro");
        assert_eq!(config.reasoning.timeout_secs, 60);
        assert_eq!(config.overlay.dpi, 200.0);
        assert_eq!(config.overlay.font_families, vec!["Noto Sans TC"]);
        assert_eq!(config.layout.seed, 7);
        assert_eq!(config.render.width, 800.0);
    }

    #[test]
    fn rejects_malformed_file() {
        assert!(parse_config("{ grid: ").is_err());
    }

    #[test]
    fn api_key_is_redacted_and_blank_is_missing() {
        let key = ApiKey::new(" secret ").unwrap();
        assert_eq!(key.expose(), "secret");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert!(ApiKey::new("   ").is_none());
    }
}
