use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use foundation::math::{Projector, Vec2};
use foundation::time::Time;
use foundation::view::{CanvasSize, ViewState};
use layers::svg::to_svg;
use layers::{
    DisplayList, DisplayOption, DisplayOptions, DrawSummary, PickTarget, SkyPolygon, SkyScene,
    SkyStyle, draw_sky,
};
use runtime::{ChartMode, DrawStatus, Frame, RedrawTrigger, RenderScheduler, TickOutcome};
use scene::{FeatureId, PickEvent, PickRouter, PickingCanvas, PointerInput, PointerKind};
use streaming::{
    Completion, ConstellationData, FetchError, FetchTicket, Request, Residency, SingleFlight,
    SkyTile, SkyTileKey, SlotEvent, TileCache, decode_constellations,
};

use crate::config::{ChartConfig, ConfigError};
use crate::source::TileSource;

#[derive(Debug, Clone, PartialEq)]
pub enum ChartError {
    Config(ConfigError),
    /// The level-0 tile was discarded, so no other tile can be addressed.
    CatalogUnavailable,
    Timeout { seconds: f64 },
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::Config(err) => write!(f, "{err}"),
            ChartError::CatalogUnavailable => write!(f, "catalog index could not be loaded"),
            ChartError::Timeout { seconds } => {
                write!(f, "chart did not settle within {seconds:.1}s")
            }
        }
    }
}

impl std::error::Error for ChartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChartError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for ChartError {
    fn from(err: ConfigError) -> Self {
        ChartError::Config(err)
    }
}

/// Everything one chart owns. Never shared with another chart.
struct ChartState {
    view: ViewState,
    grid: u32,
    mode: ChartMode,
    options: DisplayOptions,
    style: SkyStyle,
    tiles: TileCache,
    constellations: SingleFlight<ConstellationData>,
    overlays: Vec<SkyPolygon>,
    picking: PickingCanvas<PickTarget>,
    router: PickRouter,
    frame: DisplayList,
    summary: DrawSummary,
}

impl ChartState {
    /// Catalog index resident and constellation data no longer outstanding.
    fn data_ready(&self) -> bool {
        self.tiles.index().is_some() && !self.constellations.is_pending()
    }

    fn catalog_failed(&self) -> bool {
        self.tiles.residency(&SkyTileKey::ROOT) == Some(Residency::Discarded)
    }

    fn required(&self) -> std::collections::BTreeSet<SkyTileKey> {
        self.tiles.required(&self.view, self.grid)
    }

    fn draw(&mut self, frame: &Frame) -> DrawStatus {
        let required = self.required();
        let tiles: Vec<Arc<SkyTile>> = self.tiles.visible_tiles(&required).cloned().collect();
        let constellations = self.constellations.get();
        let projector = Projector::new(&self.view);
        let scene = SkyScene {
            tiles: &tiles,
            constellations: constellations.as_deref(),
            overlays: &self.overlays,
        };

        let mut list = DisplayList::new();
        let summary = draw_sky(
            &mut list,
            &projector,
            &scene,
            &self.options,
            &self.style,
            Some(&mut self.picking),
        );
        // Feature ids from the previous pass are gone.
        self.router.clear();
        self.frame = list;
        self.summary = summary;

        let tiles_pending =
            self.tiles.has_pending_in(&required) || self.constellations.is_pending();
        debug!(
            frame = frame.index,
            tiles = tiles.len(),
            stars = summary.stars_drawn,
            dsos = summary.dsos_drawn,
            pick_features = summary.pick_features,
            tiles_pending,
            "chart drawn"
        );
        DrawStatus { tiles_pending }
    }
}

/// State reachable from fetch tasks. Tasks hold it weakly.
struct Inner {
    scheduler: RenderScheduler,
    state: RefCell<ChartState>,
    started: Instant,
}

impl Inner {
    fn now(&self) -> Time {
        Time::from(self.started.elapsed())
    }

    fn complete_tile(&self, request: Request, result: Result<Vec<u8>, FetchError>) {
        let now = self.now();
        let (completion, ready) = {
            let mut state = self.state.borrow_mut();
            let completion = state.tiles.complete(request, result, now);
            (completion, state.data_ready())
        };
        match completion {
            Completion::Inserted(key) => {
                debug!(tile = %key, "tile loaded");
                self.scheduler.request_redraw(RedrawTrigger::TileLoaded);
            }
            Completion::Retrying { key, retry_at } => {
                debug!(tile = %key, retry_at = retry_at.seconds(), "tile retry scheduled");
            }
            Completion::Discarded(key) if key == SkyTileKey::ROOT => {
                warn!("catalog index discarded; chart cannot load stars");
            }
            Completion::Discarded(_) => {}
            Completion::Stale => debug!(request = request.0, "late tile completion ignored"),
        }
        self.mark_ready(ready);
    }

    fn complete_constellations(&self, request: Request, result: Result<Vec<u8>, FetchError>) {
        let now = self.now();
        let result = result.and_then(|body| decode_constellations(&body).map_err(FetchError::from));
        let (event, ready) = {
            let mut state = self.state.borrow_mut();
            let event = state.constellations.complete(request, result, now);
            (event, state.data_ready())
        };
        match event {
            SlotEvent::Ready => {
                debug!("constellations loaded");
                self.scheduler.request_redraw(RedrawTrigger::TileLoaded);
            }
            SlotEvent::Retrying { retry_at } => {
                debug!(retry_at = retry_at.seconds(), "constellation retry scheduled");
            }
            SlotEvent::Failed => warn!("drawing without constellation data"),
            SlotEvent::Stale => {}
        }
        self.mark_ready(ready);
    }

    fn mark_ready(&self, ready: bool) {
        if ready && !self.scheduler.is_ready() {
            info!("chart data ready");
            self.scheduler.request_redraw(RedrawTrigger::DataReady);
        }
    }
}

/// One interactive chart.
///
/// Single-threaded: fetches run as `spawn_local` tasks, so every method that
/// may dispatch a fetch must be called inside a `tokio::task::LocalSet`.
/// Tasks only keep a weak handle; results arriving after the chart is dropped
/// are discarded.
pub struct Chart<S> {
    inner: Rc<Inner>,
    source: Rc<S>,
}

impl<S: TileSource + 'static> Chart<S> {
    pub fn new(config: &ChartConfig, source: S) -> Result<Self, ChartError> {
        config.validate()?;
        let view = config.view_state();
        let (width, height) = pixel_size(view.canvas);
        let picking = match config.pick_seed {
            Some(seed) => PickingCanvas::with_seed(width, height, seed),
            None => PickingCanvas::new(width, height),
        };
        info!(
            ra_deg = config.ra_deg,
            dec_deg = config.dec_deg,
            fov_deg = config.fov_deg,
            limiting_magnitude = view.limiting_magnitude(),
            "chart created"
        );

        let state = ChartState {
            view,
            grid: config.sampling_grid,
            mode: config.mode,
            options: config.display,
            style: SkyStyle::default(),
            tiles: TileCache::new(config.retry),
            constellations: SingleFlight::new(config.retry),
            overlays: Vec::new(),
            picking,
            router: PickRouter::new(),
            frame: DisplayList::new(),
            summary: DrawSummary::default(),
        };
        Ok(Self {
            inner: Rc::new(Inner {
                scheduler: RenderScheduler::new(),
                state: RefCell::new(state),
                started: Instant::now(),
            }),
            source: Rc::new(source),
        })
    }

    pub fn view(&self) -> ViewState {
        self.inner.state.borrow().view
    }

    pub fn mode(&self) -> ChartMode {
        self.inner.state.borrow().mode
    }

    pub fn options(&self) -> DisplayOptions {
        self.inner.state.borrow().options
    }

    pub fn is_ready(&self) -> bool {
        self.inner.scheduler.is_ready()
    }

    pub fn needs_redraw(&self) -> bool {
        self.inner.scheduler.needs_redraw()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.inner.scheduler.frames_drawn()
    }

    /// Counts from the last draw.
    pub fn summary(&self) -> DrawSummary {
        self.inner.state.borrow().summary
    }

    /// Commands of the last draw.
    pub fn frame(&self) -> DisplayList {
        self.inner.state.borrow().frame.clone()
    }

    pub fn to_svg(&self) -> String {
        to_svg(&self.inner.state.borrow().frame)
    }

    /// Resident tiles, including ones outside the current view.
    pub fn resident_tiles(&self) -> usize {
        let state = self.inner.state.borrow();
        let mut keys = state.required();
        keys.insert(SkyTileKey::ROOT);
        state.tiles.visible_tiles(&keys).count()
    }

    pub fn resize(&self, width: f64, height: f64) {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return;
        }
        {
            let mut state = self.inner.state.borrow_mut();
            state.view.set_canvas(CanvasSize::new(width, height));
            state.router.clear();
        }
        debug!(width, height, "chart resized");
        self.inner.scheduler.request_redraw(RedrawTrigger::Resize);
    }

    /// Drags the sky by `(dx, dy)` pixels.
    pub fn pan(&self, dx: f64, dy: f64) {
        if !(dx.is_finite() && dy.is_finite()) || (dx == 0.0 && dy == 0.0) {
            return;
        }
        {
            let mut state = self.inner.state.borrow_mut();
            let projector = Projector::new(&state.view);
            let center = state.view.canvas.center();
            let target = projector.unproject(center - Vec2::new(dx, dy));
            state.view.set_center(target.ra, target.dec);
        }
        self.inner.scheduler.request_redraw(RedrawTrigger::PanZoom);
    }

    /// `factor > 1` zooms in.
    pub fn zoom(&self, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        {
            let mut state = self.inner.state.borrow_mut();
            let half_width = state.view.scale_x / factor;
            state.view.set_half_width(half_width);
        }
        self.inner.scheduler.request_redraw(RedrawTrigger::PanZoom);
    }

    /// Returns `true` if the option changed.
    pub fn set_option(&self, option: DisplayOption, enabled: bool) -> bool {
        let changed = self.inner.state.borrow_mut().options.set(option, enabled);
        if changed {
            self.inner.scheduler.request_redraw(RedrawTrigger::OptionToggled);
        }
        changed
    }

    pub fn set_overlays(&self, overlays: Vec<SkyPolygon>) {
        self.inner.state.borrow_mut().overlays = overlays;
        self.inner.scheduler.request_redraw(RedrawTrigger::OptionToggled);
    }

    /// Routes pointer input against the last drawn frame.
    pub fn pointer(&self, input: &PointerInput, kind: PointerKind) -> Option<PickEvent> {
        let mut guard = self.inner.state.borrow_mut();
        let state = &mut *guard;
        state.router.route(&state.picking, input, kind)
    }

    /// What a feature id from the last frame refers to.
    pub fn pick_target(&self, id: FeatureId) -> Option<PickTarget> {
        self.inner.state.borrow().picking.payload(id).cloned()
    }

    /// Starts fetches for every tile the current view needs, plus the
    /// constellation data. Returns the number of fetches started.
    pub fn refresh_tiles(&self) -> usize {
        let now = self.inner.now();
        let (tickets, constellations) = {
            let mut state = self.inner.state.borrow_mut();
            let required = state.required();
            let tickets = state.tiles.ensure_loaded(&required, now);
            (tickets, state.constellations.begin(now))
        };

        let started = tickets.len() + usize::from(constellations.is_some());
        for ticket in tickets {
            self.spawn_tile(ticket);
        }
        if let Some(request) = constellations {
            self.spawn_constellations(request);
        }
        started
    }

    fn spawn_tile(&self, ticket: FetchTicket) {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let source = Rc::clone(&self.source);
        tokio::task::spawn_local(async move {
            let result = source.fetch_tile(ticket.key).await;
            match weak.upgrade() {
                Some(inner) => inner.complete_tile(ticket.request, result),
                None => debug!(tile = %ticket.key, "chart gone; dropping tile"),
            }
        });
    }

    fn spawn_constellations(&self, request: Request) {
        let weak = Rc::downgrade(&self.inner);
        let source = Rc::clone(&self.source);
        tokio::task::spawn_local(async move {
            let result = source.fetch_constellations().await;
            if let Some(inner) = weak.upgrade() {
                inner.complete_constellations(request, result);
            }
        });
    }

    /// One scheduler step: dispatch missing tiles, then draw if owed.
    pub fn tick(&self) -> TickOutcome {
        let inner = &self.inner;
        let now = inner.now();
        if inner.scheduler.is_drawing() {
            return inner.scheduler.tick(now, |_| DrawStatus::default());
        }
        self.refresh_tiles();
        inner.scheduler.tick(now, |frame| inner.state.borrow_mut().draw(frame))
    }

    /// Data loaded, no visible tile outstanding and no redraw owed.
    pub fn is_settled(&self) -> bool {
        let state = self.inner.state.borrow();
        let required = state.required();
        self.inner.scheduler.is_ready()
            && !self.inner.scheduler.needs_redraw()
            && !state.tiles.has_pending_in(&required)
            && !state.constellations.is_pending()
            && state.tiles.is_settled(&required)
    }

    /// Ticks at the mode's poll interval until the chart settles.
    pub async fn run_until_settled(&self, timeout: Duration) -> Result<DrawSummary, ChartError> {
        let deadline = Instant::now() + timeout;
        let mut interval = tokio::time::interval(self.mode().poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if self.inner.state.borrow().catalog_failed() {
                return Err(ChartError::CatalogUnavailable);
            }
            self.tick();
            if self.is_settled() {
                info!(frames = self.frames_drawn(), "chart settled");
                return Ok(self.summary());
            }
            if Instant::now() >= deadline {
                return Err(ChartError::Timeout {
                    seconds: timeout.as_secs_f64(),
                });
            }
        }
    }

    /// Polls forever; every period is a redraw trigger. Drop the future to
    /// stop.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.mode().poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.inner.scheduler.request_redraw(RedrawTrigger::Poll);
            self.tick();
        }
    }
}

fn pixel_size(canvas: CanvasSize) -> (u32, u32) {
    (
        canvas.width.max(0.0).round() as u32,
        canvas.height.max(0.0).round() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::{Chart, ChartError};
    use crate::config::ChartConfig;
    use crate::source::{LocalBoxFuture, TileSource};
    use foundation::math::Projector;
    use layers::{DisplayOption, OverlayKind, PickTarget, SkyPolygon};
    use runtime::TickOutcome;
    use scene::{PickEvent, PointerInput, PointerKind};
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, HashMap};
    use std::rc::Rc;
    use std::time::Duration;
    use streaming::{FetchError, RetryPolicy, SkyTileKey};
    use tokio::task::LocalSet;

    const ROOT_TILE: &[u8] = br#"{
        "stars": [[83.9, -5.3, 2.0, null, null, "Test Star"], [84.5, -4.0, 12.5]],
        "dsos": [],
        "tiles": [[6.0, 1, 1], [8.0, 24, 12]]
    }"#;

    const CONSTELLATIONS: &[u8] = br#"{
        "boundaries": [],
        "lines": {"simplified": [[[80.0, -8.0], [88.0, -2.0]]]},
        "name_places": [[84.0, -6.0]],
        "abbrevs": ["Ori"],
        "names": ["Orion"]
    }"#;

    #[derive(Default)]
    struct MemorySource {
        tiles: HashMap<SkyTileKey, Vec<u8>>,
        /// Level-1 RA column that answers 503.
        down_column: Option<u32>,
        fetches: RefCell<BTreeMap<SkyTileKey, usize>>,
        constellation_fetches: Cell<usize>,
    }

    impl MemorySource {
        fn with_root(root: &[u8]) -> Rc<Self> {
            let mut source = MemorySource::default();
            source.tiles.insert(SkyTileKey::ROOT, root.to_vec());
            Rc::new(source)
        }

        fn fetches(&self, key: SkyTileKey) -> usize {
            self.fetches.borrow().get(&key).copied().unwrap_or(0)
        }
    }

    impl TileSource for MemorySource {
        fn fetch_tile(&self, key: SkyTileKey) -> LocalBoxFuture<'_, Result<Vec<u8>, FetchError>> {
            *self.fetches.borrow_mut().entry(key).or_insert(0) += 1;
            if key.level == 1 && Some(key.ra_index) == self.down_column {
                return Box::pin(async move {
                    tokio::task::yield_now().await;
                    Err(FetchError::Status(503))
                });
            }
            let body = self
                .tiles
                .get(&key)
                .cloned()
                .unwrap_or_else(|| br#"{"stars": []}"#.to_vec());
            Box::pin(async move {
                tokio::task::yield_now().await;
                Ok(body)
            })
        }

        fn fetch_constellations(&self) -> LocalBoxFuture<'_, Result<Vec<u8>, FetchError>> {
            self.constellation_fetches.set(self.constellation_fetches.get() + 1);
            Box::pin(async move {
                tokio::task::yield_now().await;
                Ok(CONSTELLATIONS.to_vec())
            })
        }
    }

    fn orion() -> ChartConfig {
        ChartConfig {
            ra_deg: 83.8,
            dec_deg: -5.4,
            fov_deg: 10.0,
            width: 400.0,
            height: 300.0,
            pick_seed: Some(42),
            ..ChartConfig::default()
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn loads_tiles_once_and_settles() {
        let source = MemorySource::with_root(ROOT_TILE);
        let chart = Chart::new(&orion(), Rc::clone(&source)).unwrap();

        let summary = LocalSet::new()
            .run_until(chart.run_until_settled(Duration::from_secs(30)))
            .await
            .unwrap();

        assert!(chart.is_ready());
        assert_eq!(summary.stars_drawn, 1);
        assert_eq!(summary.stars_culled, 1);
        assert_eq!(summary.constellation_lines, 1);
        assert!(chart.to_svg().contains("Ori"));

        let fetched = source.fetches.borrow().clone();
        assert!(fetched.len() > 1, "level 1 tiles should be requested");
        assert!(fetched.keys().any(|k| k.level == 1));
        assert!(fetched.values().all(|&n| n == 1), "{fetched:?}");
        assert_eq!(source.constellation_fetches.get(), 1);
        assert_eq!(chart.resident_tiles(), fetched.len());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn repeated_refresh_dispatches_once() {
        let source = MemorySource::with_root(ROOT_TILE);
        let chart = Chart::new(&orion(), Rc::clone(&source)).unwrap();
        LocalSet::new()
            .run_until(async {
                assert_eq!(chart.refresh_tiles(), 2);
                assert_eq!(chart.refresh_tiles(), 0);
                assert_eq!(chart.tick(), TickOutcome::Idle);
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
            })
            .await;
        assert_eq!(source.fetches(SkyTileKey::ROOT), 1);
        assert_eq!(source.constellation_fetches.get(), 1);
        assert!(chart.is_ready());
        assert!(chart.needs_redraw());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn clicks_resolve_to_drawn_stars() {
        let source = MemorySource::with_root(ROOT_TILE);
        let chart = Chart::new(&orion(), source).unwrap();
        LocalSet::new()
            .run_until(chart.run_until_settled(Duration::from_secs(30)))
            .await
            .unwrap();

        let star = Projector::new(&chart.view())
            .project(83.9f64.to_radians(), -5.3f64.to_radians())
            .unwrap();
        let at = PointerInput::Mouse {
            x: star.x,
            y: star.y,
        };
        let click = chart.pointer(&at, PointerKind::Click);
        let Some(PickEvent::Click {
            feature: Some(id), ..
        }) = click
        else {
            panic!("expected a feature under the star, got {click:?}");
        };
        match chart.pick_target(id) {
            Some(PickTarget::Star(s)) => assert_eq!(s.name.as_deref(), Some("Test Star")),
            other => panic!("unexpected pick {other:?}"),
        }

        let corner = PointerInput::Mouse { x: 1.0, y: 1.0 };
        assert!(matches!(
            chart.pointer(&corner, PointerKind::Click),
            Some(PickEvent::Click { feature: None, .. })
        ));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn overlays_are_drawn_and_pickable() {
        let chart = Chart::new(&orion(), MemorySource::with_root(ROOT_TILE)).unwrap();
        let local = LocalSet::new();
        local
            .run_until(chart.run_until_settled(Duration::from_secs(30)))
            .await
            .unwrap();

        chart.set_overlays(vec![SkyPolygon {
            id: "cam-3".to_string(),
            label: None,
            kind: OverlayKind::DetectionGroup,
            vertices: vec![[81.5, -9.0], [82.5, -9.0], [82.5, -8.0], [81.5, -8.0]],
        }]);
        assert!(chart.needs_redraw());
        let outcome = local.run_until(async { chart.tick() }).await;
        assert!(matches!(outcome, TickOutcome::Drew(_)));
        assert_eq!(chart.summary().overlays_drawn, 1);

        let inside = Projector::new(&chart.view())
            .project(82f64.to_radians(), -8.5f64.to_radians())
            .unwrap();
        let at = PointerInput::Mouse {
            x: inside.x,
            y: inside.y,
        };
        let Some(PickEvent::Hover(Some(id))) = chart.pointer(&at, PointerKind::Move) else {
            panic!("expected hover over the overlay");
        };
        assert_eq!(
            chart.pick_target(id),
            Some(PickTarget::Overlay {
                id: "cam-3".to_string(),
                kind: OverlayKind::DetectionGroup,
            })
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn failing_tile_left_behind_stops_redraws() {
        let mut source = MemorySource::default();
        source.tiles.insert(SkyTileKey::ROOT, ROOT_TILE.to_vec());
        source.down_column = Some(0);
        let source = Rc::new(source);
        let config = ChartConfig {
            ra_deg: 7.0,
            ..orion()
        };
        let chart = Chart::new(&config, Rc::clone(&source)).unwrap();
        let local = LocalSet::new();

        // A visible tile in backoff keeps the chart unsettled.
        let err = local
            .run_until(chart.run_until_settled(Duration::from_secs(10)))
            .await
            .unwrap_err();
        assert_eq!(err, ChartError::Timeout { seconds: 10.0 });
        let retried = source
            .fetches
            .borrow()
            .iter()
            .any(|(k, &n)| k.level == 1 && k.ra_index == 0 && n > 1);
        assert!(retried);

        // Half a field per drag, until the failing column is far behind.
        for _ in 0..32 {
            chart.pan(200.0, 0.0);
        }
        let ra = chart.view().ra0.to_degrees();
        assert!((150.0..180.0).contains(&ra), "center drifted to {ra}");

        local
            .run_until(chart.run_until_settled(Duration::from_secs(30)))
            .await
            .unwrap();
        let frames = chart.frames_drawn();
        let poll = chart.mode().poll_interval();
        local
            .run_until(async {
                for _ in 0..50 {
                    tokio::time::sleep(poll).await;
                    assert_eq!(chart.tick(), TickOutcome::Idle);
                }
            })
            .await;
        assert_eq!(chart.frames_drawn(), frames);
        assert!(!chart.needs_redraw());
    }

    #[test]
    fn gestures_mutate_view_and_request_redraw() {
        let chart = Chart::new(&orion(), MemorySource::with_root(ROOT_TILE)).unwrap();
        let before = chart.view();
        assert!(!chart.needs_redraw());

        chart.zoom(2.0);
        assert!((chart.view().scale_x - before.scale_x / 2.0).abs() < 1e-12);
        assert!(chart.needs_redraw());

        // Dragging right brings eastern sky (higher RA) to the center.
        chart.pan(40.0, 0.0);
        assert!(chart.view().ra0 > before.ra0);
        assert!((chart.view().dec0 - before.dec0).abs() < 1e-3);

        chart.resize(800.0, 300.0);
        let view = chart.view();
        assert!((view.scale_y.tan() / view.scale_x.tan() - 300.0 / 800.0).abs() < 1e-12);

        assert!(chart.set_option(DisplayOption::Grid, false));
        assert!(!chart.set_option(DisplayOption::Grid, false));
        assert!(!chart.options().grid);

        chart.zoom(f64::NAN);
        chart.resize(0.0, 10.0);
        assert_eq!(chart.view().canvas.width, 800.0);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn malformed_root_gives_up() {
        let source = MemorySource::with_root(b"<html>oops</html>");
        let config = ChartConfig {
            retry: RetryPolicy {
                base_delay_s: 0.1,
                max_delay_s: 1.0,
                max_malformed_attempts: 3,
            },
            ..orion()
        };
        let chart = Chart::new(&config, Rc::clone(&source)).unwrap();
        let err = LocalSet::new()
            .run_until(chart.run_until_settled(Duration::from_secs(60)))
            .await
            .unwrap_err();
        assert_eq!(err, ChartError::CatalogUnavailable);
        assert_eq!(source.fetches(SkyTileKey::ROOT), 3);
        assert!(!chart.is_ready());
        assert_eq!(chart.frames_drawn(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn late_results_after_teardown_are_dropped() {
        let source = MemorySource::with_root(ROOT_TILE);
        let local = LocalSet::new();
        local
            .run_until(async {
                let chart = Chart::new(&orion(), Rc::clone(&source)).unwrap();
                chart.refresh_tiles();
                drop(chart);
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
            })
            .await;
        assert_eq!(source.fetches(SkyTileKey::ROOT), 1);
        // Only the test's handle is left once the tasks finished.
        assert_eq!(Rc::strong_count(&source), 1);
    }
}
