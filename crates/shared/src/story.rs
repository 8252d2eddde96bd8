use tracing::{debug, info, warn};

use crate::attrs::{AttributeBag, Attributes};
use crate::config::{MapConfig, TourTiming, WORLD_VIEW};
use crate::edit::LocationDraft;
use crate::engine::{FrameId, MapEngine, PageHost, Sky, TimerId};
use crate::events::{CommandQueue, MapCommand, MapEvent};
use crate::ids::IdSource;
use crate::media::{Edge, EdgeDecl, MediaDecl, MediaOverlay};
use crate::models::{ElementKey, StopId, ViewState};
use crate::registry::{DeclaredLocation, LocationRegistry, ReconcileResult};
use crate::tour::{Stage, TourController};
use crate::url_state::{UrlState, UrlStateCodec};
use crate::view_state::ViewStateStore;

pub struct StoryMap<E: MapEngine, P: PageHost> {
    config: MapConfig,
    store: ViewStateStore,
    registry: LocationRegistry,
    tour: TourController,
    ids: Box<dyn IdSource>,
    commands: CommandQueue,
    engine: E,
    page: P,
    loaded: bool,
}

impl<E: MapEngine, P: PageHost> StoryMap<E, P> {
    /// Resolve the root's configuration against the page `url` and persist
    /// the initial pose.
    pub fn new<B: AttributeBag + ?Sized>(
        root: &mut B,
        url: &str,
        codec: UrlStateCodec,
        ids: Box<dyn IdSource>,
        engine: E,
        page: P,
    ) -> Self {
        let url_state = codec.decode(url);
        let config = MapConfig::resolve(root, &url_state);
        Self::with_config(config, codec, ids, engine, page)
    }

    pub fn with_config(
        config: MapConfig,
        codec: UrlStateCodec,
        ids: Box<dyn IdSource>,
        engine: E,
        mut page: P,
    ) -> Self {
        let store = ViewStateStore::initialize(config.initial_pose, codec, &mut page);
        let tour = TourController::new(
            config.initial_pose,
            config.orbit,
            config.popups,
            TourTiming::default(),
        );
        info!(pose = %config.initial_pose, popups = config.popups, orbit = config.orbit, "story map initialized");
        Self {
            config,
            store,
            registry: LocationRegistry::new(),
            tour,
            ids,
            commands: CommandQueue::new(),
            engine,
            page,
            loaded: false,
        }
    }

    /// Replace the orbit timing. Only meaningful before the map loads.
    pub fn with_timing(mut self, timing: TourTiming) -> Self {
        self.tour = TourController::new(
            self.config.initial_pose,
            self.config.orbit,
            self.config.popups,
            timing,
        );
        self
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn pose(&self) -> ViewState {
        self.store.pose()
    }

    pub fn store(&self) -> &ViewStateStore {
        &self.store
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    pub fn tour(&self) -> &TourController {
        &self.tour
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn split(&mut self) -> (&mut TourController, Stage<'_, E, P>) {
        (
            &mut self.tour,
            Stage {
                registry: &self.registry,
                store: &self.store,
                engine: &mut self.engine,
                page: &mut self.page,
            },
        )
    }

    /// The engine is ready: install the scene, stops, overlays and edges,
    /// arm the orbit countdown and announce `MAP LOADED`. Runs once.
    pub fn on_engine_loaded(
        &mut self,
        locations: &[DeclaredLocation],
        media: &[MediaDecl],
        edges: &[EdgeDecl],
    ) {
        if self.loaded {
            warn!("engine reported load twice, ignoring");
            return;
        }
        let sky = if self.config.no_sky {
            Sky::Night
        } else {
            Sky::Atmosphere
        };
        self.engine.configure_scene(sky);

        self.reconcile(locations);

        for decl in media {
            match MediaOverlay::resolve(decl, self.ids.as_mut()) {
                Ok(overlay) => self.engine.add_media(&overlay),
                Err(err) => {
                    warn!(key = %decl.key, "skipping media overlay: {err}");
                    self.page.render_notice(&decl.key, &err.notice());
                }
            }
        }

        for decl in edges {
            let registry = &self.registry;
            match Edge::resolve(decl, |id| registry.anchor_of(id), self.ids.as_mut()) {
                Ok(edge) => self.engine.add_edge(&edge),
                Err(err) => {
                    warn!(key = %decl.key, "skipping edge: {err}");
                    self.page.render_notice(&decl.key, &err.notice());
                }
            }
        }

        self.tour.start(&mut self.page);
        self.loaded = true;
        info!(stops = self.registry.len(), "map loaded");
        self.page.emit(MapEvent::Loaded);
    }

    /// Queue a command; nothing runs until [`Self::pump`].
    pub fn submit(&mut self, cmd: MapCommand) {
        self.commands.push(cmd);
    }

    /// Run every queued command in submission order.
    pub fn pump(&mut self) {
        while let Some(cmd) = self.commands.pop() {
            self.dispatch(cmd);
        }
    }

    pub fn dispatch(&mut self, cmd: MapCommand) {
        debug!(command = %cmd, "dispatching");
        let (tour, stage) = self.split();
        match cmd {
            MapCommand::NextSlide => tour.next(stage),
            MapCommand::PrevSlide => tour.prev(stage),
            MapCommand::ShowHome => tour.home(stage),
            MapCommand::FlyHome => tour.fly_to(WORLD_VIEW, stage),
        }
    }

    pub fn next(&mut self) {
        self.dispatch(MapCommand::NextSlide);
    }

    pub fn prev(&mut self) {
        self.dispatch(MapCommand::PrevSlide);
    }

    pub fn home(&mut self) {
        self.dispatch(MapCommand::ShowHome);
    }

    /// A marker was clicked.
    pub fn select_stop(&mut self, id: &StopId) {
        let (tour, stage) = self.split();
        tour.select_stop(id, stage);
    }

    /// The camera came to rest after a user or programmatic move.
    pub fn on_engine_settle(&mut self, pose: ViewState) {
        let orbiting = self.tour.is_orbiting();
        self.store.apply_engine_move(pose, orbiting, &mut self.page);
    }

    pub fn on_pointer_activity(&mut self) {
        self.tour.on_pointer_activity(&mut self.page);
    }

    pub fn on_timer(&mut self, timer: TimerId) {
        self.tour.on_timer(timer, &mut self.engine, &mut self.page);
    }

    pub fn on_frame(&mut self, frame: FrameId, timestamp_ms: f64) {
        self.tour.on_frame(frame, timestamp_ms, &mut self.engine, &mut self.page);
    }

    /// Structural change under the root. Reconciles only when the set of
    /// attached locations changed.
    pub fn on_mutation(&mut self, attached: &[DeclaredLocation]) {
        if let Some(result) = self
            .registry
            .on_mutation(attached, self.ids.as_mut(), &mut self.engine)
        {
            self.after_reconcile(result);
        }
    }

    /// Unconditional reconciliation against `attached`.
    pub fn reconcile(&mut self, attached: &[DeclaredLocation]) -> usize {
        let result = self
            .registry
            .reconcile(attached, self.ids.as_mut(), &mut self.engine);
        let added = result.added.len();
        self.after_reconcile(result);
        added
    }

    fn after_reconcile(&mut self, result: ReconcileResult) {
        for (key, err) in &result.rejected {
            self.page.render_notice(key, &err.notice());
        }
        self.tour.registry_changed(self.registry.len());
    }

    /// A known location's pose attributes changed.
    pub fn location_updated(&mut self, key: &ElementKey, attrs: &Attributes) {
        self.registry.location_updated(key, attrs, &mut self.engine);
    }

    /// A location element was detached.
    pub fn location_removed(&mut self, key: &ElementKey) {
        if self.registry.location_removed(key, &mut self.engine).is_some() {
            self.tour.registry_changed(self.registry.len());
        }
    }

    /// Draft a new location at the current camera pose.
    pub fn capture_location(&self, title: &str, body: &str) -> LocationDraft {
        LocationDraft::capture(&UrlState::from_view_state(&self.store.pose()), title, body)
    }
}
