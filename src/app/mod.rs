use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Context, Vec2, vec2};
use log::warn;

use crate::api::{
    ApiClient, Category, EntityDto, EvidenceDto, InteractionElements, SubgraphDto,
};
use crate::weight::{RadiusScale, ScaleMode, WeightCoefficients};

mod graph;
mod physics;
mod relation;
mod render_utils;
mod ui;

use graph::{PairSelection, reconcile_subgraph};
use physics::{ForceConfig, Simulation, category_centers_circle};
use relation::{EvidenceKey, RelationState};

const DEFAULT_VIEWPORT: Vec2 = vec2(900.0, 900.0);
const MIN_NODE_RADIUS: f32 = 2.0;
const SEARCH_LIMIT: usize = 5;
const RESIZE_SETTLE: Duration = Duration::from_secs(1);

pub struct BlobVizApp {
    api: ApiClient,
    seeds: Vec<String>,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<SubgraphDto, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

impl BlobVizApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, api: ApiClient, seeds: Vec<String>) -> Self {
        let state = Self::start_load(api.clone(), seeds.clone());
        Self { api, seeds, state }
    }

    fn spawn_load(api: ApiClient, seeds: Vec<String>) -> Receiver<Result<SubgraphDto, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = api
                .best_subgraph(&seeds, ViewModel::DEFAULT_CATEGORY_COUNTS)
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(api: ApiClient, seeds: Vec<String>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(api, seeds),
        }
    }
}

impl eframe::App for BlobVizApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(subgraph) => AppState::Ready(Box::new(ViewModel::new(
                            self.api.clone(),
                            self.seeds.clone(),
                            subgraph,
                        ))),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading interaction graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint_after(Duration::from_millis(100));
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the interaction graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.api.clone(), self.seeds.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                model.show(ctx);
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ViewMode {
    Root,
    Relation,
}

#[derive(Clone, Debug)]
struct DetailNode {
    id: String,
    label: String,
    category: Category,
    degree: u32,
}

struct VisualSettings {
    intercluster_opacity: f32,
    intracluster_opacity: f32,
    label_opacity: f32,
    max_radius: f32,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            intercluster_opacity: 0.35,
            intracluster_opacity: 0.35,
            label_opacity: 1.0,
            max_radius: 30.0,
        }
    }
}

/// One in-flight background request per query type; a newer request
/// supersedes an older one, and responses carrying a stale sequence
/// number are discarded ("last request wins").
struct FetchChannel<T> {
    label: &'static str,
    seq: u64,
    slot: Option<(u64, Receiver<Result<T, String>>)>,
    error: Option<String>,
}

impl<T: Send + 'static> FetchChannel<T> {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            seq: 0,
            slot: None,
            error: None,
        }
    }

    fn issue(&mut self, job: impl FnOnce() -> anyhow::Result<T> + Send + 'static) {
        self.seq += 1;
        if self.slot.is_some() {
            warn!(
                "{}: request #{} supersedes an in-flight request",
                self.label, self.seq
            );
        }

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(job().map_err(|error| format!("{error:#}")));
        });
        self.slot = Some((self.seq, rx));
        self.error = None;
    }

    fn poll(&mut self) -> Option<T> {
        let (issued_seq, rx) = self.slot.as_ref()?;
        let issued_seq = *issued_seq;

        match rx.try_recv() {
            Ok(result) => {
                self.slot = None;
                if issued_seq != self.seq {
                    warn!("{}: discarding stale response #{issued_seq}", self.label);
                    return None;
                }
                match result {
                    Ok(value) => Some(value),
                    Err(error) => {
                        warn!("{}: {error}", self.label);
                        self.error = Some(error);
                        None
                    }
                }
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.slot = None;
                self.error = Some("background worker disconnected".to_owned());
                None
            }
        }
    }

    fn in_flight(&self) -> bool {
        self.slot.is_some()
    }
}

struct Fetches {
    subgraph: FetchChannel<SubgraphDto>,
    weights: FetchChannel<HashMap<String, f64>>,
    relation: FetchChannel<InteractionElements>,
    search: FetchChannel<Vec<EntityDto>>,
    synonyms: FetchChannel<Vec<String>>,
    evidence: FetchChannel<Vec<EvidenceDto>>,
}

impl Fetches {
    fn new() -> Self {
        Self {
            subgraph: FetchChannel::new("subgraph"),
            weights: FetchChannel::new("node weights"),
            relation: FetchChannel::new("interaction"),
            search: FetchChannel::new("entity search"),
            synonyms: FetchChannel::new("synonyms"),
            evidence: FetchChannel::new("evidence"),
        }
    }
}

struct ViewModel {
    api: ApiClient,

    sim: Simulation,
    forces: ForceConfig,
    radius_scale: RadiusScale,
    scale_mode: ScaleMode,
    coefficients: WeightCoefficients,
    visual: VisualSettings,
    simulation_enabled: bool,

    view_mode: ViewMode,
    relation: Option<RelationState>,
    pending_relation: Option<(String, String)>,
    pair_selection: PairSelection,
    drag_node: Option<usize>,
    detail: Option<DetailNode>,
    synonyms: Vec<String>,
    evidence_key: Option<EvidenceKey>,
    evidence_items: Vec<EvidenceDto>,

    seeds: Vec<String>,
    category_counts: [u32; 4],
    search_text: String,
    search_results: Vec<EntityDto>,

    pan: Vec2,
    zoom: f32,
    pending_viewport: Option<(Vec2, Instant)>,

    fetches: Fetches,
}

impl ViewModel {
    const DEFAULT_CATEGORY_COUNTS: [u32; 4] = [5, 5, 5, 5];

    fn new(api: ApiClient, seeds: Vec<String>, initial: SubgraphDto) -> Self {
        let sim = Simulation::new(DEFAULT_VIEWPORT);
        let forces = ForceConfig::for_viewport(DEFAULT_VIEWPORT);

        let mut model = Self {
            api,
            sim,
            forces,
            radius_scale: RadiusScale::fit(&[], ScaleMode::Linear, MIN_NODE_RADIUS, 30.0),
            scale_mode: ScaleMode::Linear,
            coefficients: WeightCoefficients::default(),
            visual: VisualSettings::default(),
            simulation_enabled: true,
            view_mode: ViewMode::Root,
            relation: None,
            pending_relation: None,
            pair_selection: PairSelection::default(),
            drag_node: None,
            detail: None,
            synonyms: Vec::new(),
            evidence_key: None,
            evidence_items: Vec::new(),
            seeds,
            category_counts: Self::DEFAULT_CATEGORY_COUNTS,
            search_text: String::new(),
            search_results: Vec::new(),
            pan: Vec2::ZERO,
            zoom: 1.0,
            pending_viewport: None,
            fetches: Fetches::new(),
        };
        model.apply_subgraph(initial);
        model
    }

    fn show(&mut self, ctx: &Context) {
        self.process_fetches();
        self.apply_pending_viewport();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui));

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_controls(ui));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.draw_details(ui);
                    ui.separator();
                    self.draw_evidence(ui);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| match self.view_mode {
            ViewMode::Root => self.draw_graph(ui),
            ViewMode::Relation => self.draw_relation(ui),
        });
    }

    fn draw_top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("blobviz");
            ui.separator();

            // Settling indicator driven by the simulation energy.
            let alpha = self.sim.alpha().clamp(0.0, 1.0);
            let fill = if alpha > 0.5 {
                Color32::from_rgb(0xdc, 0x35, 0x45)
            } else if alpha > 0.2 {
                Color32::from_rgb(0xff, 0xc1, 0x07)
            } else {
                Color32::from_rgb(0x19, 0x87, 0x54)
            };
            ui.label("entropy");
            ui.add(
                egui::ProgressBar::new(alpha)
                    .desired_width(140.0)
                    .fill(fill),
            );

            ui.separator();
            ui.label(format!(
                "entities: {}  relations: {}",
                self.sim.nodes().len(),
                self.sim.links().len()
            ));

            if self.view_mode == ViewMode::Relation {
                ui.separator();
                if ui.button("Back to graph").clicked() {
                    self.leave_relation();
                }
            }

            if let Some(error) = self.fetches.subgraph.error.clone() {
                ui.separator();
                ui.colored_label(Color32::from_rgb(0xdc, 0x35, 0x45), error);
                if ui.button("Retry").clicked() {
                    self.request_subgraph();
                }
            } else if let Some(error) = self.fetches.relation.error.clone() {
                ui.separator();
                ui.colored_label(
                    Color32::from_rgb(0xdc, 0x35, 0x45),
                    format!("relation: {error}"),
                );
            } else if self.fetches.subgraph.in_flight() || self.fetches.relation.in_flight() {
                ui.separator();
                ui.spinner();
            }
        });
    }

    fn process_fetches(&mut self) {
        if let Some(subgraph) = self.fetches.subgraph.poll() {
            self.apply_subgraph(subgraph);
        }

        if let Some(weights) = self.fetches.weights.poll() {
            for node in self.sim.nodes_mut() {
                if let Some(weight) = weights.get(&node.id) {
                    node.weight = *weight;
                }
            }
            self.refit_radii();
        }

        if let Some(elements) = self.fetches.relation.poll() {
            self.enter_relation(elements);
        }

        if let Some(results) = self.fetches.search.poll() {
            self.search_results = results;
        }

        if let Some(synonyms) = self.fetches.synonyms.poll() {
            self.synonyms = synonyms;
        }

        if let Some(mut items) = self.fetches.evidence.poll() {
            items.sort_by(|a, b| {
                b.impact_value()
                    .unwrap_or(f64::NEG_INFINITY)
                    .total_cmp(&a.impact_value().unwrap_or(f64::NEG_INFINITY))
            });
            self.evidence_items = items;
        }
    }

    /// Merge a fetched subgraph into the simulation, preserving layout
    /// for surviving nodes. Malformed payloads fail closed and surface
    /// on the subgraph channel.
    fn apply_subgraph(&mut self, fetched: SubgraphDto) {
        // An in-progress drag must not leave its pin behind once the
        // node indices shift under it.
        if let Some(index) = self.drag_node.take() {
            self.sim.release_node(index);
        }

        let center = self.sim.viewport() * 0.5;
        match reconcile_subgraph(self.sim.nodes(), &fetched, center) {
            Ok((nodes, links)) => {
                if let Err(error) = self.sim.set_graph(nodes, links) {
                    self.fetches.subgraph.error = Some(error.to_string());
                    return;
                }
                self.pair_selection
                    .retain_present(|id| self.sim.index_of(id).is_some());
                self.refit_radii();
                self.sim.configure(self.root_force_config());
                self.sim.restart(1.0);
                self.request_node_weights();
            }
            Err(error) => {
                self.fetches.subgraph.error = Some(error.to_string());
            }
        }
    }

    /// Refit the radius scale to the current weight domain and push the
    /// resulting radii onto the nodes.
    fn refit_radii(&mut self) {
        let values = self
            .sim
            .nodes()
            .iter()
            .map(|node| node.weight)
            .collect::<Vec<_>>();
        self.radius_scale = RadiusScale::fit(
            &values,
            self.scale_mode,
            MIN_NODE_RADIUS,
            self.visual.max_radius,
        );
        let scale = self.radius_scale;
        for node in self.sim.nodes_mut() {
            node.radius = scale.radius(node.weight);
        }
    }

    fn root_force_config(&self) -> ForceConfig {
        let viewport = self.sim.viewport();
        let mut config = self.forces;
        config.separation.centers = category_centers_circle(viewport.x * 0.25, viewport);
        config
    }

    /// Apply edited force parameters without resetting node velocities,
    /// then reheat so the change is visible.
    fn update_forces(&mut self) {
        if self.view_mode != ViewMode::Root {
            return;
        }
        self.sim.configure(self.root_force_config());
        self.sim.restart(1.0);
    }

    fn request_subgraph(&mut self) {
        let api = self.api.clone();
        let seeds = self.seeds.clone();
        let counts = self.category_counts;
        self.fetches
            .subgraph
            .issue(move || api.best_subgraph(&seeds, counts));
    }

    fn request_node_weights(&mut self) {
        let ids = self
            .sim
            .nodes()
            .iter()
            .map(|node| node.id.clone())
            .collect::<Vec<_>>();
        if ids.is_empty() {
            return;
        }
        let api = self.api.clone();
        let coefficients = self.coefficients;
        self.fetches
            .weights
            .issue(move || api.node_weights(&ids, &coefficients));
    }

    fn request_relation(&mut self, anchor1: String, anchor2: String) {
        let api = self.api.clone();
        let source = crate::util::entity_curie(&anchor1);
        let destination = crate::util::entity_curie(&anchor2);
        self.pending_relation = Some((anchor1, anchor2));
        self.fetches
            .relation
            .issue(move || api.interaction(&source, &destination, true));
    }

    fn request_search(&mut self) {
        let text = self.search_text.trim().to_owned();
        if text.is_empty() {
            self.search_results.clear();
            return;
        }
        let api = self.api.clone();
        self.fetches
            .search
            .issue(move || api.search_nodes(&text, SEARCH_LIMIT));
    }

    fn request_synonyms(&mut self, entity_id: &str) {
        let api = self.api.clone();
        let id = crate::util::entity_curie(entity_id);
        self.fetches.synonyms.issue(move || api.synonyms(&id));
    }

    fn request_evidence(&mut self, key: EvidenceKey) {
        let api = self.api.clone();
        let source = crate::util::entity_curie(&key.source);
        let target = crate::util::entity_curie(&key.target);
        let polarity = key.polarity.label().to_owned();
        self.evidence_key = Some(key);
        self.evidence_items.clear();
        self.fetches
            .evidence
            .issue(move || api.evidence(&source, &target, &polarity));
    }

    fn enter_relation(&mut self, elements: InteractionElements) {
        let Some((anchor1, anchor2)) = self.pending_relation.take() else {
            return;
        };
        log::debug!(
            "interaction returned {} context nodes, {} edges",
            elements.nodes.len(),
            elements.edges.len()
        );

        let anchor_labels = [
            self.resolve_entity_label(&anchor1, &elements),
            self.resolve_entity_label(&anchor2, &elements),
        ];
        let induced = relation::induced_edges(&elements, &anchor1, &anchor2);
        let graph = relation::build_relation_graph(anchor1, anchor2, induced);
        self.relation = Some(RelationState::new(graph, anchor_labels));
        self.view_mode = ViewMode::Relation;
        if let Some(index) = self.drag_node.take() {
            self.sim.release_node(index);
        }

        // The root simulation is suspended, not reset: the same engine
        // keeps its positions and eases context nodes toward the ellipse.
        let viewport = self.sim.viewport();
        self.sim
            .configure(relation::relation_force_config(&self.forces, viewport));
        self.sim.restart(0.5);
    }

    /// Best display label for an entity: the live node's label, else the
    /// interaction response's context node, else the raw id.
    fn resolve_entity_label(&self, id: &str, elements: &InteractionElements) -> String {
        if let Some(index) = self.sim.index_of(id) {
            return self.sim.nodes()[index].label.clone();
        }

        let curie = crate::util::entity_curie(id);
        elements
            .nodes
            .iter()
            .find(|node| {
                node.id
                    .as_deref()
                    .is_some_and(|node_id| crate::util::entity_curie(node_id) == curie)
            })
            .and_then(|node| node.label.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn leave_relation(&mut self) {
        if let Some(state) = self.relation.take() {
            for id in [&state.graph.anchor1, &state.graph.anchor2] {
                if let Some(index) = self.sim.index_of(id) {
                    self.sim.release_node(index);
                }
            }
        }
        self.view_mode = ViewMode::Root;
        self.evidence_key = None;
        self.evidence_items.clear();
        self.sim.configure(self.root_force_config());
        self.sim.restart(0.5);
    }

    /// Viewport changes are coalesced: the forces are refit only after
    /// the panel size has been stable for a while.
    fn note_viewport(&mut self, size: Vec2) {
        if (size - self.sim.viewport()).length() <= 1.0 {
            return;
        }
        let pending_same = self
            .pending_viewport
            .is_some_and(|(pending, _)| (pending - size).length() <= 1.0);
        if !pending_same {
            self.pending_viewport = Some((size, Instant::now() + RESIZE_SETTLE));
        }
    }

    fn apply_pending_viewport(&mut self) {
        let Some((size, deadline)) = self.pending_viewport else {
            return;
        };
        if Instant::now() < deadline {
            return;
        }
        self.pending_viewport = None;
        self.sim.set_viewport(size);
        match self.view_mode {
            ViewMode::Root => self.sim.configure(self.root_force_config()),
            ViewMode::Relation => self
                .sim
                .configure(relation::relation_force_config(&self.forces, size)),
        }
        self.sim.restart(0.3);
    }

    /// Double-clicking an entity expands it (adds it to the query seed
    /// set) or collapses it again; the refetched subgraph brings its
    /// neighborhood in or out.
    fn toggle_seed(&mut self, id: String) {
        if let Some(position) = self.seeds.iter().position(|seed| seed == &id) {
            if self.seeds.len() > 1 {
                self.seeds.remove(position);
                self.request_subgraph();
            }
        } else {
            self.seeds.push(id);
            self.request_subgraph();
        }
    }

    fn set_detail_node(&mut self, index: usize) {
        let node = &self.sim.nodes()[index];
        let changed = self
            .detail
            .as_ref()
            .is_none_or(|detail| detail.id != node.id);
        if !changed {
            return;
        }
        self.detail = Some(DetailNode {
            id: node.id.clone(),
            label: node.label.clone(),
            category: node.category,
            degree: node.degree,
        });
        self.synonyms.clear();
        let id = node.id.clone();
        self.request_synonyms(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<T: Send + 'static>(channel: &mut FetchChannel<T>) -> Option<T> {
        for _ in 0..200 {
            if let Some(value) = channel.poll() {
                return Some(value);
            }
            if !channel.in_flight() {
                return None;
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn later_request_supersedes_earlier() {
        let mut channel: FetchChannel<u32> = FetchChannel::new("test");
        channel.issue(|| {
            thread::sleep(Duration::from_millis(40));
            Ok(1)
        });
        channel.issue(|| Ok(2));

        assert_eq!(drain(&mut channel), Some(2));
        assert!(channel.error.is_none());
    }

    #[test]
    fn failure_lands_in_a_terminal_error_state() {
        let mut channel: FetchChannel<u32> = FetchChannel::new("test");
        channel.issue(|| Err(anyhow::anyhow!("backend unavailable")));

        assert_eq!(drain(&mut channel), None);
        assert!(
            channel
                .error
                .as_deref()
                .is_some_and(|error| error.contains("backend unavailable"))
        );
        assert!(!channel.in_flight());

        // A fresh request clears the terminal error.
        channel.issue(|| Ok(7));
        assert!(channel.error.is_none());
        assert_eq!(drain(&mut channel), Some(7));
    }
}
