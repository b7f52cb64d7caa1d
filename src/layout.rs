use crate::blueprint::{Category, Graph};
use crate::config::{LayoutConfig, RenderConfig};
use crate::text_metrics;
use crate::theme::Theme;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MIN_DISTANCE: f64 = 0.01;
const CONVERGENCE_THRESHOLD: f64 = 1e-4;
const LABEL_FONT_FAMILY: &str = "sans-serif";

#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub id: String,
    pub label: String,
    pub category: Category,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub label_width: f32,
}

#[derive(Debug, Clone)]
pub struct EdgeLayout {
    pub from: String,
    pub to: String,
    pub points: Vec<(f32, f32)>,
}

/// Positioned graph, nodes in graph insertion order.
#[derive(Debug, Clone)]
pub struct Layout {
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub width: f32,
    pub height: f32,
}

/// Fruchterman–Reingold positions in `[-1, 1]²`, one per node in insertion
/// order. The same graph and seed always give the same positions.
pub fn spring_positions(graph: &Graph, config: &LayoutConfig) -> Vec<[f64; 2]> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![[0.0, 0.0]];
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut pos: Vec<[f64; 2]> = (0..n).map(|_| [rng.r#gen::<f64>(), rng.r#gen::<f64>()]).collect();

    let mut adjacency = vec![vec![false; n]; n];
    for (a, b) in graph.edges() {
        if let (Some(i), Some(j)) = (graph.index_of(a), graph.index_of(b))
            && i != j
        {
            adjacency[i][j] = true;
            adjacency[j][i] = true;
        }
    }

    let k = if config.optimal_distance > 0.0 {
        config.optimal_distance
    } else {
        (1.0 / n as f64).sqrt()
    };
    let mut temperature = extent(&pos) * 0.1;
    let cooling = temperature / (config.iterations as f64 + 1.0);

    for _ in 0..config.iterations {
        let mut displacement = vec![[0.0f64; 2]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dx = pos[i][0] - pos[j][0];
                let dy = pos[i][1] - pos[j][1];
                let distance = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
                let attraction = if adjacency[i][j] { distance / k } else { 0.0 };
                let force = k * k / (distance * distance) - attraction;
                displacement[i][0] += dx * force;
                displacement[i][1] += dy * force;
            }
        }

        let mut total_shift = 0.0;
        for (point, delta) in pos.iter_mut().zip(&displacement) {
            let length = (delta[0] * delta[0] + delta[1] * delta[1]).sqrt().max(MIN_DISTANCE);
            let shift = [delta[0] * temperature / length, delta[1] * temperature / length];
            point[0] += shift[0];
            point[1] += shift[1];
            total_shift += (shift[0] * shift[0] + shift[1] * shift[1]).sqrt();
        }
        temperature -= cooling;
        if total_shift / (n as f64) < CONVERGENCE_THRESHOLD {
            break;
        }
    }

    rescale(&mut pos);
    pos
}

fn extent(pos: &[[f64; 2]]) -> f64 {
    let span = |axis: usize| {
        let (min, max) = pos.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
            (lo.min(p[axis]), hi.max(p[axis]))
        });
        max - min
    };
    span(0).max(span(1))
}

/// Centers on the mean and scales the largest coordinate to 1.
fn rescale(pos: &mut [[f64; 2]]) {
    let n = pos.len() as f64;
    let mean = pos
        .iter()
        .fold([0.0, 0.0], |acc, p| [acc[0] + p[0] / n, acc[1] + p[1] / n]);
    let mut limit: f64 = 0.0;
    for p in pos.iter_mut() {
        p[0] -= mean[0];
        p[1] -= mean[1];
        limit = limit.max(p[0].abs()).max(p[1].abs());
    }
    if limit > 0.0 {
        for p in pos.iter_mut() {
            p[0] /= limit;
            p[1] /= limit;
        }
    }
}

/// Maps spring positions onto the canvas, leaving room for labels.
pub fn compute_layout(graph: &Graph, theme: &Theme, config: &LayoutConfig, render: &RenderConfig) -> Layout {
    let positions = spring_positions(graph, config);
    let radius = config.node_radius;

    let label_widths: Vec<f32> = graph
        .nodes()
        .map(|node| text_metrics::measure_text_width(&node.label, theme.font_size, LABEL_FONT_FAMILY))
        .collect();
    let widest = label_widths.iter().copied().fold(0.0f32, f32::max);

    let width = render.width.max(1.0);
    let height = render.height.max(1.0);
    let pad_x = (config.margin + radius.max(widest / 2.0)).min(width / 2.0);
    let pad_y = (config.margin + radius + theme.font_size).min(height / 2.0);
    let usable_w = (width - 2.0 * pad_x).max(0.0);
    let usable_h = (height - 2.0 * pad_y).max(0.0);

    let nodes: Vec<NodeLayout> = graph
        .nodes()
        .zip(positions.iter())
        .zip(label_widths)
        .map(|((node, p), label_width)| NodeLayout {
            id: node.id.clone(),
            label: node.label.clone(),
            category: node.category.clone(),
            x: pad_x + ((p[0] as f32 + 1.0) / 2.0) * usable_w,
            y: pad_y + ((p[1] as f32 + 1.0) / 2.0) * usable_h,
            radius,
            label_width,
        })
        .collect();

    let edges = graph
        .edges()
        .filter_map(|(from, to)| {
            let a = &nodes[graph.index_of(from)?];
            let b = &nodes[graph.index_of(to)?];
            Some(EdgeLayout {
                from: from.to_string(),
                to: to.to_string(),
                points: vec![(a.x, a.y), (b.x, b.y)],
            })
        })
        .collect();

    Layout {
        nodes,
        edges,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::parse_blueprint;

    fn sample_graph() -> Graph {
        parse_blueprint(
            r#"{
                "nodes": [
                    {"id": "art", "label": "Art", "category": "theme"},
                    {"id": "idle", "label": "Idleness"},
                    {"id": "net", "label": "Net Art", "category": "digital"},
                    {"id": "protest", "label": "Protest", "category": "political"},
                    {"id": "lonely", "label": "Loner"}
                ],
                "edges": [
                    {"source": "art", "target": "idle"},
                    {"source": "art", "target": "net"},
                    {"source": "net", "target": "protest"}
                ]
            }"#,
        )
        .unwrap()
        .graph
    }

    #[test]
    fn same_seed_gives_same_layout() {
        let graph = sample_graph();
        let config = LayoutConfig::default();
        assert_eq!(spring_positions(&graph, &config), spring_positions(&graph, &config));
    }

    #[test]
    fn different_seed_changes_layout() {
        let graph = sample_graph();
        let a = spring_positions(&graph, &LayoutConfig::default());
        let b = spring_positions(&graph, &LayoutConfig { seed: 7, ..LayoutConfig::default() });
        assert_ne!(a, b);
    }

    #[test]
    fn positions_are_rescaled_to_unit_box() {
        let positions = spring_positions(&sample_graph(), &LayoutConfig::default());
        assert_eq!(positions.len(), 5);
        let max = positions
            .iter()
            .flat_map(|p| [p[0].abs(), p[1].abs()])
            .fold(0.0f64, f64::max);
        assert!((max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn trivial_graphs() {
        assert!(spring_positions(&Graph::new(), &LayoutConfig::default()).is_empty());
        let mut single = Graph::new();
        single.upsert_node("only", "Only", Category::Concept);
        assert_eq!(spring_positions(&single, &LayoutConfig::default()), vec![[0.0, 0.0]]);
    }

    #[test]
    fn layout_stays_on_canvas() {
        let graph = sample_graph();
        let render = RenderConfig::default();
        let layout = compute_layout(&graph, &Theme::default(), &LayoutConfig::default(), &render);
        assert_eq!(layout.nodes.len(), 5);
        assert_eq!(layout.edges.len(), 3);
        for node in &layout.nodes {
            assert!(node.x >= 0.0 && node.x <= render.width, "{} x={}", node.id, node.x);
            assert!(node.y >= 0.0 && node.y <= render.height, "{} y={}", node.id, node.y);
        }
        let art = layout.nodes.iter().find(|node| node.id == "art").unwrap();
        let edge = layout.edges.iter().find(|e| e.from == "art" && e.to == "idle").unwrap();
        assert_eq!(edge.points[0], (art.x, art.y));
    }
}
