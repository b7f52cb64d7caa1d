pub mod blueprint;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod event;
pub mod fonts;
pub mod geometry;
pub mod layout;
pub mod layout_dump;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod placement;
pub mod reasoning;
pub mod render;
pub mod search;
pub mod text_metrics;
pub mod theme;

pub use blueprint::{Blueprint, BlueprintError, Category, Graph, load_blueprint, parse_blueprint};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use event::{EventInsertion, add_event, derive_event_id};
pub use geometry::grid_to_pixel;
pub use pipeline::{EventRequest, PipelineError, PlacementReport, place_event, render_graph, run_pipeline};
pub use placement::{PlacementDecision, validate};
