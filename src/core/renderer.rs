//! Scroll-scrubbed frame renderer - ties sampler, preloader, mapper and compositor
//!
//! **Lifecycle**:
//! - `mount()` sizes the surface to the viewport, subscribes to host and preload
//!   events, then starts preloading the sequence
//! - While loading, the phase carries the load percentage and nothing is drawn
//! - Once every frame is in, the frame for the current scroll position is drawn
//!   and every later scroll or resize redraws
//! - `unmount()` (or drop) cancels the preload and removes every subscription;
//!   events that still arrive afterwards change nothing
//!
//! **Threading**: handlers run on whichever thread emits (host thread for scroll
//! and resize, worker threads for preload results). The state mutex is never held
//! while emitting, starting or cancelling a preload, or unsubscribing, so
//! subscribers may call back into the renderer.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, trace, warn};
use uuid::Uuid;

use super::completion::CompletionGate;
use super::compositor::Compositor;
use super::event_bus::{EventBus, SubscriptionId};
use super::frame_mapper::FrameMapper;
use super::preloader::{FrameSet, PreloadHandle, Preloader};
use super::renderer_events::{
    CompletionChanged, FrameDrawn, PreloadFailed, PreloadFinished, PreloadProgress,
    ScrollMeasured, ViewportResized,
};
use super::scroll::{ScrollMetrics, ScrollProgress, ScrollSampler};
use crate::config::RendererConfig;
use crate::entities::{AssetStore, Surface, SurfaceSize, WorkerPool};

/// What the presentation layer should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererPhase {
    /// Preload running; show the placeholder with `progress` percent
    Loading { progress: u8 },
    /// All frames resident; the surface shows the current frame
    Ready,
    /// Preload failed; the placeholder stays up
    Failed { reason: String },
}

impl RendererPhase {
    pub fn is_ready(&self) -> bool {
        matches!(self, RendererPhase::Ready)
    }
}

/// Events produced under the state lock, published after it is released
#[derive(Default)]
struct Outbox {
    completion: Option<bool>,
    drawn: Option<FrameDrawn>,
}

impl Outbox {
    fn publish(self, bus: &EventBus) {
        if let Some(complete) = self.completion {
            bus.emit(CompletionChanged { complete });
        }
        if let Some(drawn) = self.drawn {
            bus.emit(drawn);
        }
    }
}

struct RendererState<S> {
    mounted: bool,
    cycle: Uuid,
    phase: RendererPhase,
    frames: Option<FrameSet>,
    viewport: SurfaceSize,
    surface: S,
    sampler: ScrollSampler,
    mapper: FrameMapper,
    gate: CompletionGate,
    compositor: Compositor,
    /// Index on the surface right now, to skip redundant redraws
    last_drawn: Option<usize>,
}

impl<S: Surface> RendererState<S> {
    fn current_index(&self) -> usize {
        self.mapper.map(self.sampler.progress())
    }

    fn accepts(&self, cycle: Uuid) -> bool {
        self.mounted && cycle == self.cycle
    }

    /// Draw the frame for the current progress. Without `force`, an unchanged
    /// index is not redrawn.
    fn redraw(&mut self, force: bool) -> Option<FrameDrawn> {
        if !self.phase.is_ready() {
            return None;
        }
        let index = self.current_index();
        if !force && self.last_drawn == Some(index) {
            return None;
        }
        let frames = self.frames.as_ref()?;
        let drawn = self.compositor.draw_index(&mut self.surface, frames, index)?;
        self.last_drawn = Some(drawn);
        trace!("Renderer: drew frame {}", drawn);
        Some(FrameDrawn {
            index: drawn,
            size: self.surface.size(),
        })
    }

    fn on_scroll(&mut self, metrics: &ScrollMetrics) -> Outbox {
        if !self.mounted {
            return Outbox::default();
        }
        let Some(progress) = self.sampler.sample(metrics) else {
            return Outbox::default();
        };
        Outbox {
            completion: self.gate.update(progress),
            drawn: self.redraw(false),
        }
    }

    /// Backing surface follows the viewport; the current frame is redrawn at the
    /// new size since resizing clears the surface.
    fn on_resize(&mut self, size: SurfaceSize) -> Outbox {
        if !self.mounted {
            return Outbox::default();
        }
        debug!("Renderer: viewport {} -> {}", self.viewport, size);
        self.viewport = size;
        self.surface.set_size(size);
        Outbox {
            completion: None,
            drawn: self.redraw(true),
        }
    }

    fn on_progress(&mut self, event: &PreloadProgress) {
        if !self.accepts(event.cycle) {
            return;
        }
        if let RendererPhase::Loading { progress } = &mut self.phase {
            *progress = event.percent;
        }
    }

    fn on_loaded(&mut self, event: &PreloadFinished) -> Outbox {
        if !self.accepts(event.cycle) {
            trace!("Renderer: ignoring frames of cycle {}", event.cycle);
            return Outbox::default();
        }
        info!("Renderer: {} frames ready", event.frames.len());
        self.mapper = FrameMapper::new(event.frames.len());
        self.frames = Some(Arc::clone(&event.frames));
        self.phase = RendererPhase::Ready;
        // First draw goes through the resize path so the surface matches the viewport
        self.on_resize(self.viewport)
    }

    fn on_failed(&mut self, event: &PreloadFailed) {
        if !self.accepts(event.cycle) {
            return;
        }
        warn!("Renderer: frames unavailable, keeping placeholder ({})", event.error);
        self.frames = None;
        self.phase = RendererPhase::Failed {
            reason: event.error.to_string(),
        };
    }
}

fn lock<S>(state: &Mutex<RendererState<S>>) -> MutexGuard<'_, RendererState<S>> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// A mounted scroll-scrubbed frame sequence.
///
/// The host drives it through the bus: `ScrollMeasured` on every scroll,
/// `ViewportResized` on every resize. It answers with `CompletionChanged` and
/// `FrameDrawn`; preload progress comes straight from the preloader.
pub struct ScrollyRenderer<S: Surface + 'static> {
    state: Arc<Mutex<RendererState<S>>>,
    bus: EventBus,
    preloader: Preloader,
    handle: PreloadHandle,
    subscriptions: Vec<SubscriptionId>,
}

impl<S: Surface + 'static> ScrollyRenderer<S> {
    /// Mount on `surface` and start preloading the configured sequence.
    ///
    /// With an inline pool the whole preload (and the first draw) completes
    /// before this returns.
    pub fn mount(
        config: &RendererConfig,
        bus: EventBus,
        store: Arc<dyn AssetStore>,
        pool: Arc<dyn WorkerPool>,
        mut surface: S,
        viewport: SurfaceSize,
    ) -> Self {
        surface.set_size(viewport);

        let cycle = Uuid::new_v4();
        let state = Arc::new(Mutex::new(RendererState {
            mounted: true,
            cycle,
            phase: RendererPhase::Loading { progress: 0 },
            frames: None,
            viewport,
            surface,
            sampler: ScrollSampler::new(config.scroll_offset),
            mapper: FrameMapper::new(config.total_frames),
            gate: CompletionGate::new(config.completion_threshold),
            compositor: config.compositor(),
            last_drawn: None,
        }));

        let subscriptions = subscribe_all(&state, &bus);

        info!(
            "Renderer: mounted at {}, {} frames ({})",
            viewport,
            config.total_frames,
            config.frame_pattern.resolve(0)
        );
        let preloader = Preloader::new(store, pool, config.frame_pattern.clone(), bus.clone());
        let handle = preloader.start_cycle(cycle, config.total_frames);

        Self {
            state,
            bus,
            preloader,
            handle,
            subscriptions,
        }
    }

    /// Cancel the preload and drop every subscription. Idempotent.
    pub fn unmount(&mut self) {
        {
            let mut state = lock(&self.state);
            if !state.mounted {
                return;
            }
            state.mounted = false;
            state.frames = None;
        }
        self.preloader.cancel();
        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
        info!("Renderer: unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        lock(&self.state).mounted
    }

    pub fn phase(&self) -> RendererPhase {
        lock(&self.state).phase.clone()
    }

    /// Last published load percentage of the preload cycle
    pub fn load_progress(&self) -> u8 {
        self.handle.progress()
    }

    pub fn preload(&self) -> &PreloadHandle {
        &self.handle
    }

    /// Latest sampled scroll progress
    pub fn progress(&self) -> ScrollProgress {
        lock(&self.state).sampler.progress()
    }

    /// Frame index for the latest scroll progress (drawn once frames are ready)
    pub fn frame_index(&self) -> usize {
        lock(&self.state).current_index()
    }

    pub fn is_complete(&self) -> bool {
        lock(&self.state).gate.is_complete()
    }

    pub fn viewport(&self) -> SurfaceSize {
        lock(&self.state).viewport
    }

    /// Inspect the surface (e.g. to save or present it)
    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&lock(&self.state).surface)
    }
}

impl<S: Surface + 'static> Drop for ScrollyRenderer<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn subscribe_all<S: Surface + 'static>(
    state: &Arc<Mutex<RendererState<S>>>,
    bus: &EventBus,
) -> Vec<SubscriptionId> {
    let mut ids = Vec::with_capacity(5);

    let (st, out) = (Arc::clone(state), bus.clone());
    ids.push(bus.subscribe::<ScrollMeasured, _>(move |e| {
        let outbox = lock(&st).on_scroll(&e.0);
        outbox.publish(&out);
    }));

    let (st, out) = (Arc::clone(state), bus.clone());
    ids.push(bus.subscribe::<ViewportResized, _>(move |e| {
        let outbox = lock(&st).on_resize(e.0);
        outbox.publish(&out);
    }));

    let st = Arc::clone(state);
    ids.push(bus.subscribe::<PreloadProgress, _>(move |e| lock(&st).on_progress(e)));

    let (st, out) = (Arc::clone(state), bus.clone());
    ids.push(bus.subscribe::<PreloadFinished, _>(move |e| {
        let outbox = lock(&st).on_loaded(e);
        outbox.publish(&out);
    }));

    let st = Arc::clone(state);
    ids.push(bus.subscribe::<PreloadFailed, _>(move |e| lock(&st).on_failed(e)));

    ids
}
