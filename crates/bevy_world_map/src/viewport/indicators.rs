//! Loading preloader and load-complete indicator.
//!
//! Both are pure state: the presentation layer reads [`PreloaderView`] and
//! [`CompleteView`] every frame and positions its widgets from them.

use crate::coords::{Direction, Span};
use crate::curve::KeyframeCurve;
use crate::window::{SegmentState, SegmentWindow, SlotId};

use super::Viewport;
use super::layout::Layout;

const BYTES_PER_MIB: f32 = 1024.0 * 1024.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndicatorState {
  Hidden,
  Visible,
  /// Sliding out; becomes `Hidden` when the slide time reaches zero.
  Hiding,
}

/// Snapshot of the loading preloader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreloaderView {
  pub state: IndicatorState,
  pub side: Direction,
  /// Slide-in amount in `0.0..=1.0` from the slide curve.
  pub slide: f32,
  pub progress: f32,
  pub size_mib: f32,
}

/// Preloader shown while the neighbor the player scrolls towards is loading.
#[derive(Clone, Debug)]
pub struct LoadingIndicator {
  state: IndicatorState,
  side: Direction,
  time: f32,
  initialized: bool,
  progress: f32,
  size_bytes: u64,
  show_fraction: f32,
  slide: KeyframeCurve,
}

impl LoadingIndicator {
  pub fn new(show_fraction: f32, slide: KeyframeCurve) -> Self {
    Self {
      state: IndicatorState::Hidden,
      side: Direction::Right,
      time: 0.0,
      initialized: false,
      progress: 0.0,
      size_bytes: 0,
      show_fraction,
      slide,
    }
  }

  pub fn state(&self) -> IndicatorState {
    self.state
  }

  /// Fully shown or sliding in. A hiding preloader does not count.
  pub fn is_visible(&self) -> bool {
    self.state == IndicatorState::Visible
  }

  /// Side the preloader is on, unless hidden.
  pub fn side(&self) -> Option<Direction> {
    (self.state != IndicatorState::Hidden).then_some(self.side)
  }

  pub fn reset(&mut self) {
    self.hide(false);
    self.initialized = false;
  }

  fn show(&mut self, side: Direction, size_bytes: u64) {
    self.state = IndicatorState::Visible;
    self.side = side;
    self.time = 0.0;
    self.progress = 0.0;
    self.size_bytes = size_bytes;
  }

  fn hide(&mut self, transition: bool) {
    self.state = if transition {
      IndicatorState::Hiding
    } else {
      IndicatorState::Hidden
    };
  }

  /// Shows, hides or refreshes the preloader for this frame.
  ///
  /// The behind neighbor is checked before the ahead one. `bounds` is the
  /// scrollable span; the preloader shows once the border on the loading side
  /// is within `show_fraction` viewport widths of the viewport edge and the
  /// download size is known.
  pub fn actualize(&mut self, window: &SegmentWindow, bounds: Option<Span>, viewport: &Viewport) {
    let waiting = [Direction::Left, Direction::Right]
      .into_iter()
      .find_map(|direction| {
        window
          .neighbor(direction)
          .filter(|s| s.state() == SegmentState::Loading)
          .map(|s| (direction, s))
      });

    let Some((direction, segment)) = waiting else {
      if self.is_visible() {
        self.hide(false);
      }
      self.initialized = false;
      return;
    };
    let Some(bounds) = bounds else {
      return;
    };

    let border = match direction {
      Direction::Left => viewport.center_x - bounds.min,
      Direction::Right => bounds.max - viewport.center_x,
    }
    .max(0.0);
    let half = viewport.width * 0.5;
    if border - half > self.show_fraction * viewport.width {
      if self.is_visible() {
        self.hide(true);
        self.initialized = false;
      }
      return;
    }

    let size = segment.size_bytes().unwrap_or(0);
    if !self.initialized && size > 0 {
      self.initialized = true;
      self.show(direction, size);
    }
    if self.initialized
      && let Some(id) = segment.id()
    {
      self.progress = window.loader().progress(&window.asset_name(id));
    }
  }

  /// Advances the slide animation.
  pub fn animate(&mut self, dt: f32) {
    match self.state {
      IndicatorState::Visible if self.time < 1.0 => self.time += dt,
      IndicatorState::Hiding if self.time > 0.0 => self.time -= dt,
      IndicatorState::Hiding => self.hide(false),
      _ => {}
    }
  }

  pub fn view(&self) -> PreloaderView {
    let slide = match self.state {
      IndicatorState::Hidden => 0.0,
      _ => self.slide.sample(self.time.clamp(0.0, 1.0)),
    };
    PreloaderView {
      state: self.state,
      side: self.side,
      slide,
      progress: self.progress,
      size_mib: self.size_bytes as f32 / BYTES_PER_MIB,
    }
  }
}

/// Snapshot of the load-complete indicator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompleteView {
  pub side: Direction,
  pub opacity: f32,
  pub clickable: bool,
}

#[derive(Clone, Debug)]
struct Tracking {
  side: Direction,
  /// Segment whose on-screen motion measures the scroll distance.
  tracked: SlotId,
  last_offset: f32,
  passed: f32,
  /// +1 when scrolling towards `side` reads as positive travel.
  coef: f32,
  to_next: f32,
  to_prev: f32,
}

/// Arrow offering to scroll to a neighbor that finished loading while the
/// preloader was up. Fades with the distance scrolled since it appeared.
#[derive(Clone, Debug)]
pub struct CompleteIndicator {
  tracking: Option<Tracking>,
  clickable: bool,
  fade: KeyframeCurve,
}

impl CompleteIndicator {
  pub fn new(fade: KeyframeCurve) -> Self {
    Self {
      tracking: None,
      clickable: false,
      fade,
    }
  }

  pub fn is_visible(&self) -> bool {
    self.tracking.is_some()
  }

  pub fn side(&self) -> Option<Direction> {
    self.tracking.as_ref().map(|t| t.side)
  }

  pub fn hide(&mut self) {
    self.tracking = None;
    self.clickable = false;
  }

  /// Starts tracking from the current segment. Distances are normalized by
  /// how far the viewport center is from the seam on each side.
  pub fn start(&mut self, side: Direction, window: &SegmentWindow, layout: &Layout, viewport: &Viewport) {
    let Some(tracked) = window.current() else {
      return;
    };
    let Some(x) = layout.placement(tracked) else {
      return;
    };

    let seam_distance = |direction: Direction| {
      window
        .neighbor(direction)
        .and_then(|s| layout.span(window, s.slot()))
        .map(|span| (span.edge(direction.opposite()) - viewport.center_x).abs())
        .unwrap_or(viewport.width)
    };
    let (to_next, to_prev) = match side {
      Direction::Left => (seam_distance(Direction::Left), seam_distance(Direction::Right)),
      Direction::Right => (seam_distance(Direction::Right), seam_distance(Direction::Left)),
    };

    self.tracking = Some(Tracking {
      side,
      tracked,
      last_offset: x - viewport.center_x,
      passed: 0.0,
      coef: match side {
        Direction::Left => 1.0,
        Direction::Right => -1.0,
      },
      to_next,
      to_prev,
    });
    self.clickable = true;
  }

  /// Accumulates travel and returns the indicator for this frame, or `None`
  /// once it faded out or lost its reference.
  pub fn update(
    &mut self,
    window: &SegmentWindow,
    layout: &Layout,
    viewport: &Viewport,
  ) -> Option<CompleteView> {
    let tracking = self.tracking.as_mut()?;
    let Some(x) = layout.placement(tracking.tracked) else {
      self.hide();
      return None;
    };

    let offset = x - viewport.center_x;
    tracking.passed += offset - tracking.last_offset;
    tracking.last_offset = offset;

    let travel = tracking.coef * tracking.passed;
    let scale = if travel > 0.0 {
      tracking.to_next
    } else {
      tracking.to_prev
    };
    let normalized = if scale > f32::EPSILON {
      travel / scale
    } else if travel == 0.0 {
      0.0
    } else {
      travel.signum() * f32::INFINITY
    };

    let opacity = self.fade.sample(normalized);
    if opacity < 0.0 {
      self.hide();
      return None;
    }

    let current_x = window.current().and_then(|slot| layout.placement(slot));
    if current_x.is_some_and(|current_x| (x - current_x).abs() > viewport.width) {
      self.hide();
      return None;
    }

    Some(CompleteView {
      side: tracking.side,
      opacity,
      clickable: self.clickable,
    })
  }

  /// Consumes the click and returns the seam to scroll to.
  pub fn click(&mut self, window: &SegmentWindow, layout: &Layout) -> Option<f32> {
    if !self.clickable {
      return None;
    }
    let side = self.tracking.as_ref()?.side;
    let neighbor = window.neighbor(side)?;
    let span = layout.span(window, neighbor.slot())?;
    self.clickable = false;
    Some(span.edge(side.opposite()))
  }
}
