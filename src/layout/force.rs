//! Fruchterman-Reingold force-directed layout.
//!
//! Every pair of nodes repels with a force of `k² / d²` along their offset,
//! every edge pulls its endpoints together with `d² / k`, and each iteration
//! moves nodes by at most the current temperature, which cools linearly to
//! zero over the iteration budget.
//!
//! Repulsion is O(V²) per iteration and attraction O(E).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::params::ParamTable;
use super::{Layout, LayoutBase, RunStatus, Viewport, set_position};
use crate::error::{LayoutError, Result};
use crate::geom::{self, Point, Rect, Vector};
use crate::graph::{Graph, NodeId};

/// Floor on distances, so coincident nodes never divide by zero.
const EPSILON: f64 = 1e-6;
/// Initial scatter, as a fraction of the half-extent of the bounds.
const ALPHA: f64 = 0.1;

/// How iterations are spread over `run` calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ForceMode {
    /// The whole iteration budget on every call.
    #[default]
    Batch,
    /// A slice of the budget per call, continuing from the previous call.
    #[serde(rename_all = "camelCase")]
    Incremental { iterations_per_frame: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceConfig {
    pub max_iterations: u32,
    /// Seed for initial placement.
    pub seed: u64,
    pub mode: ForceMode,
    /// Seed for the boundary jitter. Unseeded when `None`.
    pub jitter_seed: Option<u64>,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 700,
            seed: 42,
            mode: ForceMode::Batch,
            jitter_seed: None,
        }
    }
}

impl ForceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(LayoutError::InvalidIterations);
        }
        if let ForceMode::Incremental {
            iterations_per_frame: 0,
        } = self.mode
        {
            return Err(LayoutError::InvalidIterationsPerFrame);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct ForceParams {
    loc: Point,
    disp: Vector,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            loc: Point::origin(),
            disp: Vector::zero(),
        }
    }
}

pub struct ForceDirectedLayout {
    base: LayoutBase,
    config: ForceConfig,
    params: ParamTable<ForceParams>,
    /// Visible nodes and whether each is fixed.
    nodes: Vec<(NodeId, bool)>,
    edges: Vec<(NodeId, NodeId)>,
    bounds: Rect,
    temp0: f64,
    temp: f64,
    force_constant: f64,
    iteration: u32,
    initialized: bool,
    placement: StdRng,
    jitter: StdRng,
    trace: Vec<f64>,
}

impl ForceDirectedLayout {
    pub fn new(config: ForceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            base: LayoutBase::new(),
            placement: StdRng::seed_from_u64(config.seed),
            jitter: jitter_rng(config.jitter_seed),
            config,
            params: ParamTable::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            bounds: Rect::zero(),
            temp0: 0.0,
            temp: 0.0,
            force_constant: 0.0,
            iteration: 0,
            initialized: false,
            trace: Vec::new(),
        })
    }

    pub fn with_defaults() -> Self {
        let config = ForceConfig::default();
        Self {
            base: LayoutBase::new(),
            placement: StdRng::seed_from_u64(config.seed),
            jitter: jitter_rng(config.jitter_seed),
            config,
            params: ParamTable::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            bounds: Rect::zero(),
            temp0: 0.0,
            temp: 0.0,
            force_constant: 0.0,
            iteration: 0,
            initialized: false,
            trace: Vec::new(),
        }
    }

    pub fn config(&self) -> &ForceConfig {
        &self.config
    }

    /// Replace the configuration. Retained simulation state is dropped.
    pub fn set_config(&mut self, config: ForceConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.reset();
        Ok(())
    }

    /// Iterations completed in the current simulation.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn temperature(&self) -> f64 {
        self.temp
    }

    /// Total displacement applied in each iteration so far.
    pub fn displacement_trace(&self) -> &[f64] {
        &self.trace
    }

    /// Snapshot the visible topology. Fixed nodes are kept so edges to them
    /// still pull on their neighbors.
    fn collect_topology(&mut self, graph: &Graph) {
        self.nodes = graph
            .visible_nodes()
            .map(|n| (n, graph.is_fixed(n)))
            .collect();
        self.edges = graph
            .edges()
            .filter(|&(_, s, t)| s != t && graph.is_visible(s) && graph.is_visible(t))
            .map(|(_, s, t)| (s, t))
            .collect();
    }

    /// Seeded scatter near the centre of the bounds. Fixed nodes that are
    /// already placed keep their position.
    fn seed_position(&mut self, graph: &Graph, n: NodeId, fixed: bool) -> Point {
        let b = self.bounds;
        let scale_w = ALPHA * b.width() / 2.0;
        let scale_h = ALPHA * b.height() / 2.0;
        let c = b.center();
        let p = geom::point(
            c.x + self.placement.r#gen::<f64>() * scale_w,
            c.y + self.placement.r#gen::<f64>() * scale_h,
        );
        match graph.node(n) {
            Some(d) if fixed && d.is_placed() => d.position(),
            _ => p,
        }
    }

    fn init(&mut self, graph: &Graph, bounds: Rect) {
        self.bounds = bounds;
        self.collect_topology(graph);
        self.params = ParamTable::with_bound(graph.node_bound());
        self.placement = StdRng::seed_from_u64(self.config.seed);
        self.jitter = jitter_rng(self.config.jitter_seed);
        self.iteration = 0;
        self.trace.clear();

        let count = self.nodes.len().max(1) as f64;
        self.temp0 = bounds.width() / 10.0;
        self.temp = self.temp0;
        self.force_constant = 0.75 * (bounds.area() / count).sqrt();

        for i in 0..self.nodes.len() {
            let (n, fixed) = self.nodes[i];
            let loc = self.seed_position(graph, n, fixed);
            self.params[n].loc = loc;
        }
        self.initialized = true;
    }

    /// Pick up nodes and edges added or removed since the last call, and
    /// new bounds after a resize or zoom.
    fn sync(&mut self, graph: &Graph, bounds: Rect) {
        if bounds != self.bounds {
            tracing::debug!(?bounds, "force-directed bounds changed");
            self.bounds = bounds;
            self.temp0 = bounds.width() / 10.0;
            self.temp = self.cooled(self.iteration);
        }
        self.collect_topology(graph);
        let live: Vec<bool> = {
            let mut live = vec![false; graph.node_bound()];
            for &(n, _) in &self.nodes {
                live[n.slot()] = true;
            }
            live
        };
        self.params
            .retain(|n, _| live.get(n.slot()).copied().unwrap_or(false));

        for i in 0..self.nodes.len() {
            let (n, fixed) = self.nodes[i];
            if !self.params.contains(n) {
                let loc = match graph.node(n) {
                    Some(d) if d.is_placed() => d.position(),
                    _ => self.seed_position(graph, n, fixed),
                };
                self.params[n].loc = loc;
            }
        }
        let count = self.nodes.len().max(1) as f64;
        self.force_constant = 0.75 * (self.bounds.area() / count).sqrt();
    }

    /// One iteration: repulsion, attraction, capped move, cooling.
    fn step(&mut self) {
        let k2 = self.force_constant * self.force_constant;

        for &(n1, fixed) in &self.nodes {
            if fixed {
                continue;
            }
            let loc1 = self.params[n1].loc;
            let mut disp = Vector::zero();
            for &(n2, fixed2) in &self.nodes {
                if fixed2 || n1 == n2 {
                    continue;
                }
                let delta = loc1 - self.params[n2].loc;
                let len2 = delta.square_length().max(EPSILON);
                disp += delta * (k2 / len2);
            }
            self.params[n1].disp = disp;
        }

        for &(s, t) in &self.edges {
            let delta = self.params[s].loc - self.params[t].loc;
            let len = delta.length().max(EPSILON);
            let force = len * len / self.force_constant;
            let d = delta / len * force;
            self.params[s].disp -= d;
            self.params[t].disp += d;
        }

        let mut total = 0.0;
        for i in 0..self.nodes.len() {
            let (n, fixed) = self.nodes[i];
            if fixed {
                continue;
            }
            total += self.calc_position(n);
        }

        self.trace.push(total);
        self.iteration += 1;
        self.temp = self.cooled(self.iteration);
        tracing::trace!(iteration = self.iteration, total, temp = self.temp, "force iteration");
    }

    /// Temperature after `iteration` steps of linear cooling.
    fn cooled(&self, iteration: u32) -> f64 {
        let max = f64::from(self.config.max_iterations);
        self.temp0 * (1.0 - f64::from(iteration) / max)
    }

    /// Move `n` by its displacement capped at the temperature, then pull it
    /// back inside the border with some jitter. Returns the distance moved
    /// before the border correction.
    fn calc_position(&mut self, n: NodeId) -> f64 {
        let b = self.bounds;
        let temp = self.temp;
        let np = &mut self.params[n];

        let len = np.disp.length().max(EPSILON);
        let step = np.disp / len * len.min(temp);
        if step.x.is_nan() || step.y.is_nan() {
            tracing::debug!(node = %n, "NaN displacement, node held in place");
            return 0.0;
        }
        np.loc += step;

        let border = b.width() / 50.0;
        let mut p = np.loc;
        if p.x < b.min_x() + border {
            p.x = b.min_x() + border + self.jitter.r#gen::<f64>() * border * 2.0;
        } else if p.x > b.max_x() - border {
            p.x = b.max_x() - border - self.jitter.r#gen::<f64>() * border * 2.0;
        }
        if p.y < b.min_y() + border {
            p.y = b.min_y() + border + self.jitter.r#gen::<f64>() * border * 2.0;
        } else if p.y > b.max_y() - border {
            p.y = b.max_y() - border - self.jitter.r#gen::<f64>() * border * 2.0;
        }
        np.loc = p;

        step.length()
    }

    fn finish(&self, graph: &mut Graph) {
        for &(n, _) in &self.nodes {
            set_position(graph, n, None, self.params[n].loc);
        }
    }
}

fn jitter_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

impl Layout for ForceDirectedLayout {
    fn base(&self) -> &LayoutBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayoutBase {
        &mut self.base
    }

    fn run(&mut self, graph: &mut Graph, viewport: &Viewport, fraction: f64) -> RunStatus {
        let bounds = self.base.layout_bounds(viewport);
        let max = self.config.max_iterations;

        match self.config.mode {
            ForceMode::Batch => {
                self.init(graph, bounds);
                if !self.nodes.is_empty() {
                    while self.iteration < max {
                        self.step();
                    }
                    self.finish(graph);
                }
                tracing::debug!(
                    nodes = self.nodes.len(),
                    edges = self.edges.len(),
                    iterations = self.iteration,
                    "force-directed pass complete"
                );
                RunStatus::from_fraction(fraction)
            }
            ForceMode::Incremental {
                iterations_per_frame,
            } => {
                if self.initialized {
                    self.sync(graph, bounds);
                } else {
                    self.init(graph, bounds);
                }
                if self.nodes.is_empty() {
                    return RunStatus::from_fraction(fraction);
                }
                let end = self.iteration.saturating_add(iterations_per_frame).min(max);
                while self.iteration < end {
                    self.step();
                }
                self.finish(graph);

                if self.iteration >= max {
                    tracing::debug!(nodes = self.nodes.len(), "force-directed simulation settled");
                    RunStatus::Complete
                } else {
                    RunStatus::Running
                }
            }
        }
    }

    fn reset(&mut self) {
        self.initialized = false;
        self.iteration = 0;
        self.temp = self.temp0;
        self.params.clear();
        self.trace.clear();
    }

    fn is_continuous(&self) -> bool {
        false
    }
}
