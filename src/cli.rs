use crate::blueprint::load_blueprint;
use crate::config::{ApiKey, Config, load_config};
use crate::geometry::parse_position;
use crate::output::{explanation_summary, run_timestamp};
use crate::pipeline::{EventRequest, render_graph, run_pipeline};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bpe",
    version,
    about = "Place a cultural event on the blueprint graph and mark it on the blueprint map"
)]
pub struct Args {
    /// Event description
    #[arg(value_name = "EVENT", conflicts_with = "event_flag")]
    pub event: Option<String>,

    /// Event description (alternative to the positional argument)
    #[arg(short = 'e', long = "event", id = "event_flag")]
    pub event_flag: Option<String>,

    /// Blueprint graph JSON
    #[arg(long = "blueprint")]
    pub blueprint: Option<PathBuf>,

    /// Base image to draw on (png or svg)
    #[arg(short = 'b', long = "base-image")]
    pub base_image: Option<PathBuf>,

    /// Grid cell as "col,row", overriding the model's choice
    #[arg(short = 'p', long = "position", allow_hyphen_values = true)]
    pub position: Option<String>,

    /// Reasoning model
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// API key for the reasoning service
    #[arg(short = 'k', long = "api-key", env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory for the annotated image and explanation
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Config JSON file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Also render the (updated) graph to this file (svg/png)
    #[arg(long = "graph-output")]
    pub graph_output: Option<PathBuf>,

    /// Write the graph layout as JSON (requires --graph-output)
    #[arg(long = "dump-layout", requires = "graph_output")]
    pub dump_layout: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let args = Args::parse();

    let position = args.position.as_deref().map(parse_position).transpose()?;
    let config = apply_args(load_config(args.config.as_deref())?, &args);

    let Some(event) = args.event.clone().or_else(|| args.event_flag.clone()) else {
        let Some(graph_output) = args.graph_output.as_deref() else {
            return Err(anyhow::anyhow!(
                "No event given (pass it as an argument or with --event)"
            ));
        };
        let blueprint = load_blueprint(&config.paths.blueprint)?;
        render_graph(&blueprint, &config, graph_output, args.dump_layout.as_deref())?;
        println!("Graph written to {}", graph_output.display());
        return Ok(());
    };

    let request = EventRequest {
        event,
        position_override: position,
    };
    let timestamp = run_timestamp(&chrono::Local::now());
    let report = run_pipeline(&config, &request, &timestamp)?;

    println!("{}", explanation_summary(&report.decision, &report.insertion));
    println!("Image: {}", report.paths.image.display());
    println!("Explanation: {}", report.paths.explanation.display());

    if let Some(graph_output) = args.graph_output.as_deref() {
        render_graph(&report.blueprint, &config, graph_output, args.dump_layout.as_deref())?;
        println!("Graph written to {}", graph_output.display());
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn apply_args(mut config: Config, args: &Args) -> Config {
    if let Some(path) = &args.blueprint {
        config.paths.blueprint = path.clone();
    }
    if let Some(path) = &args.base_image {
        config.paths.base_image = path.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.paths.output_dir = dir.clone();
    }
    if let Some(model) = &args.model {
        config.reasoning.model = model.clone();
    }
    if let Some(key) = args.api_key.as_deref().and_then(ApiKey::new) {
        config.api_key = Some(key);
    }
    config
}
