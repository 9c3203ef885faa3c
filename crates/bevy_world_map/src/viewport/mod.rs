//! Viewport-driven decisions over the segment window.
//!
//! The tracker never mutates the window. It reads slot states and extents,
//! keeps the world layout, and returns [`WindowCommand`]s for the owner to
//! apply.

mod indicators;
mod layout;
mod scroll;

use std::collections::HashSet;

pub use indicators::{CompleteIndicator, CompleteView, IndicatorState, LoadingIndicator, PreloaderView};
pub use layout::Layout;
pub use scroll::{MotionType, ScrollBounds, ScrollToPoint};

use crate::config::WorldMapConfig;
use crate::coords::{Direction, Span};
use crate::curve::KeyframeCurve;
use crate::window::{SegmentState, SegmentWindow, SlotId};

/// Visible part of the map this frame, in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
  pub center_x: f32,
  pub width: f32,
  pub height: f32,
  /// Finger (or mouse button) is down on the map.
  pub dragging: bool,
}

impl Viewport {
  pub fn new(center_x: f32, width: f32, height: f32) -> Self {
    Self {
      center_x,
      width,
      height,
      dragging: false,
    }
  }

  pub fn left(&self) -> f32 {
    self.center_x - self.width * 0.5
  }

  pub fn right(&self) -> f32 {
    self.center_x + self.width * 0.5
  }

  pub fn span(&self) -> Span {
    Span::centered(self.center_x, self.width)
  }
}

/// Request from the tracker to the window owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowCommand {
  /// Current segment moved to this slot; rebalance around it.
  Rebalance(SlotId),
  /// Retry the failed neighbor in this direction.
  Reload(Direction),
}

/// Activation change of a ready segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Activation {
  pub slot: SlotId,
  pub active: bool,
}

pub struct ViewportTracker {
  layout: Layout,
  active: HashSet<SlotId>,
  loading: LoadingIndicator,
  complete: CompleteIndicator,
  scroll: Option<ScrollToPoint>,
  scroll_curve: KeyframeCurve,
  scroll_duration: f32,
  reload_swipe_fraction: f32,
  border_epsilon: f32,
}

impl ViewportTracker {
  pub fn new(config: &WorldMapConfig) -> Self {
    Self {
      layout: Layout::default(),
      active: HashSet::new(),
      loading: LoadingIndicator::new(config.preloader_show_fraction, config.preloader_slide.clone()),
      complete: CompleteIndicator::new(config.complete_fade.clone()),
      scroll: None,
      scroll_curve: config.scroll_swipe.clone(),
      scroll_duration: config.scroll_duration_secs,
      reload_swipe_fraction: config.reload_swipe_fraction,
      border_epsilon: config.border_epsilon,
    }
  }

  pub fn reset(&mut self) {
    self.layout.reset();
    self.active.clear();
    self.loading.reset();
    self.complete.hide();
    self.scroll = None;
  }

  pub fn layout(&self) -> &Layout {
    &self.layout
  }

  pub fn loading(&self) -> &LoadingIndicator {
    &self.loading
  }

  pub fn complete(&self) -> &CompleteIndicator {
    &self.complete
  }

  /// Places the current slot so that payload-local `x` lands under the
  /// viewport center.
  pub fn anchor_local_x(&mut self, window: &SegmentWindow, x: f32, viewport: &Viewport) -> bool {
    let Some(current) = window.current_segment() else {
      return false;
    };
    let Some(extent) = current.extent() else {
      return false;
    };
    let center = viewport.center_x + extent.width * 0.5 - extent.local_to_offset(x);
    self.layout.anchor_on(current.slot(), center);
    true
  }

  /// Detects the viewport leaving the current segment. The nearest ready
  /// segment takes over and keeps its placement.
  pub fn detect_current_change(
    &mut self,
    window: &SegmentWindow,
    viewport: &Viewport,
  ) -> Option<WindowCommand> {
    if viewport.dragging {
      return None;
    }
    let current = window.current()?;
    let span = self.layout.span(window, current)?;
    if span.contains(viewport.center_x) {
      return None;
    }
    let nearest = self.layout.nearest(window, viewport.center_x)?;
    if nearest == current || !self.layout.reanchor(nearest) {
      return None;
    }
    Some(WindowCommand::Rebalance(nearest))
  }

  pub fn place(&mut self, window: &SegmentWindow, viewport: &Viewport) {
    self.layout.place(window, viewport);
  }

  /// Starts the load-complete indicator when the neighbor on the preloader's
  /// side just became ready. Call after placement.
  pub fn after_window_changed(&mut self, window: &SegmentWindow, viewport: &Viewport) {
    if !self.loading.is_visible() || !window.is_full() {
      return;
    }
    let Some(side) = self.loading.side() else {
      return;
    };
    if window.neighbor(side).is_some_and(|s| s.is_ready()) {
      self.complete.start(side, window, &self.layout, viewport);
    }
  }

  /// Ready segments overlapping the viewport are active. Returns changes.
  pub fn update_activation(&mut self, window: &SegmentWindow, viewport: &Viewport) -> Vec<Activation> {
    let mut changes = Vec::new();
    for segment in window.slots() {
      let Some(extent) = segment.extent() else {
        continue;
      };
      let Some(x) = self.layout.placement(segment.slot()) else {
        continue;
      };
      let active = (x - viewport.center_x).abs() <= (extent.width + viewport.width) * 0.5;
      let was_active = self.active.contains(&segment.slot());
      if active != was_active {
        if active {
          self.active.insert(segment.slot());
        } else {
          self.active.remove(&segment.slot());
        }
        changes.push(Activation {
          slot: segment.slot(),
          active,
        });
      }
    }
    self.active.retain(|slot| window.contains(*slot));
    changes
  }

  pub fn is_active(&self, slot: SlotId) -> bool {
    self.active.contains(&slot)
  }

  /// Scroll limits: the world span of the ready run around current.
  pub fn scroll_bounds(&self, window: &SegmentWindow, viewport: &Viewport) -> Option<ScrollBounds> {
    let run = window.ready_run()?;
    let slots = window.slots();
    let min = self.layout.span(window, slots[*run.start()].slot())?.min;
    let max = self.layout.span(window, slots[*run.end()].slot())?.max;

    let neighbor_loading = [Direction::Left, Direction::Right]
      .into_iter()
      .any(|d| window.neighbor(d).is_some_and(|s| s.state() == SegmentState::Loading));
    let motion = if neighbor_loading {
      MotionType::Clamped
    } else {
      MotionType::Elastic
    };

    let halt_velocity = self.loading.is_visible()
      && ((viewport.right() - max).abs() < self.border_epsilon
        || (viewport.left() - min).abs() < self.border_epsilon);

    Some(ScrollBounds {
      span: Span::new(min, max),
      motion,
      halt_velocity,
    })
  }

  /// Overscroll past the current segment towards a failed neighbor.
  pub fn reload_swipe(&self, window: &SegmentWindow, viewport: &Viewport) -> Option<WindowCommand> {
    if viewport.dragging {
      return None;
    }
    let span = self.layout.span(window, window.current()?)?;
    let threshold = viewport.width * self.reload_swipe_fraction;
    let direction = if viewport.right() - span.max > threshold {
      Direction::Right
    } else if span.min - viewport.left() > threshold {
      Direction::Left
    } else {
      return None;
    };
    window
      .neighbor(direction)
      .is_some_and(|s| s.state() == SegmentState::Failed)
      .then_some(WindowCommand::Reload(direction))
  }

  pub fn update_preloader(
    &mut self,
    window: &SegmentWindow,
    bounds: Option<&ScrollBounds>,
    viewport: &Viewport,
    dt: f32,
  ) -> PreloaderView {
    self.loading.actualize(window, bounds.map(|b| b.span), viewport);
    self.loading.animate(dt);
    self.loading.view()
  }

  pub fn update_complete(&mut self, window: &SegmentWindow, viewport: &Viewport) -> Option<CompleteView> {
    self.complete.update(window, &self.layout, viewport)
  }

  /// Starts scrolling to the seam the complete indicator points at.
  pub fn click_complete(&mut self, window: &SegmentWindow, viewport: &Viewport) -> bool {
    let Some(target) = self.complete.click(window, &self.layout) else {
      return false;
    };
    self.scroll = Some(ScrollToPoint::new(viewport.center_x, target, self.scroll_duration));
    true
  }

  /// Viewport center forced by a running scroll animation.
  pub fn advance_scroll(&mut self, dt: f32) -> Option<f32> {
    let scroll = self.scroll.as_mut()?;
    let center = scroll.advance(dt, &self.scroll_curve);
    if scroll.is_finished() {
      self.scroll = None;
    }
    Some(center)
  }

  /// Input is ignored while a programmatic scroll runs.
  pub fn is_input_locked(&self) -> bool {
    self.scroll.is_some()
  }
}
