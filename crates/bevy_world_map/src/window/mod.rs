//! The sliding segment window.
//!
//! [`SegmentWindow`] owns the ordered slot sequence and is its only writer.
//! It always mirrors catalog adjacency: slot `i + 1` holds the successor of
//! slot `i`, and positions beyond either chain end hold `Empty` placeholders.
//! After initialization it holds exactly `behind + ahead + 1` slots with the
//! current one at index `behind` once rebalanced.
//!
//! Slots only enter and leave at the two ends. Loads are started as slots
//! enter; their completions are drained from the loader once per frame and
//! parked as [`PendingSplice`]s until the splice gate opens.

mod init;
mod slot;
mod splice;

use std::ops::RangeInclusive;
use std::sync::Arc;

use bevy::log::{debug, warn};
pub use init::{InitError, InitPoll, InitTask, RetryDecision};
pub use slot::{Segment, SegmentExtent, SegmentState, SlotId};
pub use splice::{PendingSplice, SpliceGate, SpliceStep};

use crate::catalog::{SegmentCatalog, SegmentId};
use crate::config::WorldMapConfig;
use crate::coords::Direction;
use crate::loader::{LoaderEvent, SegmentLoader};

/// Notification produced by window mutations, drained by the owner.
#[derive(Clone, Debug, PartialEq)]
pub enum WindowEvent {
  /// A load failed outside the init phase.
  LoadFailed { slot: SlotId, segment: SegmentId },
  /// A pending payload was spliced outside the init phase.
  Spliced { slot: SlotId },
  /// A slot left the window.
  Removed {
    slot: SlotId,
    segment: Option<SegmentId>,
  },
}

/// Result of [`SegmentWindow::on_window_changed`].
#[derive(Clone, Debug, PartialEq)]
pub struct WindowChange {
  pub is_init: bool,
  /// Slots promoted from `Initializing` to `Ready` by this call.
  pub newly_ready: Vec<SlotId>,
  /// Maximal run of `Ready` slots around the current one.
  pub ready_run: Option<RangeInclusive<usize>>,
}

pub struct SegmentWindow {
  behind: usize,
  ahead: usize,
  slots: Vec<Segment>,
  current: Option<SlotId>,
  next_slot: u64,
  pending: Vec<PendingSplice>,
  init_phase: bool,
  catalog: Arc<dyn SegmentCatalog>,
  loader: Box<dyn SegmentLoader>,
  events: Vec<WindowEvent>,
}

impl SegmentWindow {
  pub fn new(
    behind: usize,
    ahead: usize,
    catalog: Arc<dyn SegmentCatalog>,
    loader: Box<dyn SegmentLoader>,
  ) -> Self {
    Self {
      behind,
      ahead,
      slots: Vec::with_capacity(behind + ahead + 1),
      current: None,
      next_slot: 0,
      pending: Vec::new(),
      init_phase: false,
      catalog,
      loader,
      events: Vec::new(),
    }
  }

  pub fn from_config(
    config: &WorldMapConfig,
    catalog: Arc<dyn SegmentCatalog>,
    loader: Box<dyn SegmentLoader>,
  ) -> Self {
    Self::new(config.behind_count, config.ahead_count, catalog, loader)
  }

  /// Replaces the window content with `start` and its neighbors and starts
  /// loading them, center first.
  pub fn initialize(&mut self, start: SegmentId) -> InitTask {
    self.release_all();
    self.events.clear();
    self.init_phase = true;

    debug!(
      "initializing map window at {} ({} behind, {} ahead)",
      start, self.behind, self.ahead
    );

    let center = self.allocate(Some(start));
    self.slots.push(center);
    self.issue_load(0);

    for _ in 0..self.behind {
      self.push_edge(Direction::Left);
    }
    for _ in 0..self.ahead {
      self.push_edge(Direction::Right);
    }

    InitTask::new()
  }

  /// Moves the window `count` slots towards `direction`: drops `count` slots
  /// on the opposite end and appends as many catalog neighbors on this end.
  pub fn slide(&mut self, direction: Direction, count: usize) {
    for _ in 0..count {
      self.remove_edge(direction.opposite());
    }
    for _ in 0..count {
      self.push_edge(direction);
    }
  }

  /// Makes `current` the current slot and restores `behind`/`ahead` around
  /// it. Returns whether the window moved.
  pub fn rebalance(&mut self, current: SlotId) -> bool {
    let Some(index) = self.index_of(current) else {
      warn!("rebalance around {} which left the window", current);
      return false;
    };
    self.current = Some(current);

    let trailing = self.slots.len() - 1 - index;
    let left = self.behind.saturating_sub(index);
    let right = self.ahead.saturating_sub(trailing);
    if left > 0 {
      self.slide(Direction::Left, left);
    }
    if right > 0 {
      self.slide(Direction::Right, right);
    }
    left > 0 || right > 0
  }

  /// Drains completed loads and size estimates from the loader.
  pub fn drain_loader(&mut self) {
    while let Some(event) = self.loader.try_recv() {
      let ticket = event.ticket();
      let Some(index) = self.index_of(ticket) else {
        debug!("dropping loader event for removed slot {}", ticket);
        continue;
      };

      match event {
        LoaderEvent::Sized { bytes, .. } => self.slots[index].set_size(bytes),
        LoaderEvent::Loaded { result, .. } => {
          let segment = &mut self.slots[index];
          if segment.state() != SegmentState::Loading {
            debug!(
              "ignoring load completion for {} in {:?}",
              ticket,
              segment.state()
            );
            continue;
          }
          match result {
            Ok(payload) => self.pending.push(PendingSplice {
              slot: ticket,
              payload,
            }),
            Err(failure) => {
              segment.fail();
              warn!("{}", failure);
              let Some(id) = segment.id().cloned() else {
                continue;
              };
              // a failed attempt holds no asset; a retry takes a new reference
              self.loader.unload(&self.catalog.asset_name(&id));
              if !self.init_phase {
                self.events.push(WindowEvent::LoadFailed {
                  slot: ticket,
                  segment: id,
                });
              }
            }
          }
        }
      }
    }
  }

  /// Splices every pending payload the gate lets through. Returns the number
  /// of slots moved to `Initializing`.
  pub fn promote_pending(&mut self, gate: &SpliceGate) -> usize {
    let mut promoted = 0;
    for splice in std::mem::take(&mut self.pending) {
      let index = self.index_of(splice.slot);
      match splice.maybe_resume(gate, index.is_some()) {
        SpliceStep::Continue => self.pending.push(splice),
        SpliceStep::Abandoned => {
          debug!("abandoning splice for removed slot {}", splice.slot);
        }
        SpliceStep::Resumed => {
          let Some(index) = index else {
            continue;
          };
          self.slots[index].splice(splice.payload);
          promoted += 1;
          if !self.init_phase {
            self.events.push(WindowEvent::Spliced { slot: splice.slot });
          }
        }
      }
    }
    promoted
  }

  /// Promotes every `Initializing` slot to `Ready`, computing its extent for
  /// a viewport `viewport_height` world units tall.
  pub fn on_window_changed(&mut self, is_init: bool, viewport_height: f32) -> WindowChange {
    let mut newly_ready = Vec::new();

    for segment in &mut self.slots {
      if segment.state() != SegmentState::Initializing {
        continue;
      }
      let opens_chain = segment
        .id()
        .is_some_and(|id| self.catalog.is_first_segment(id));
      let Some(payload) = segment.payload() else {
        continue;
      };

      let stub = if opens_chain { payload.leading_stub } else { 0.0 };
      let scale = if payload.height > 0.0 {
        viewport_height / payload.height
      } else {
        1.0
      };
      let extent = SegmentExtent {
        width: (payload.width - stub).max(0.0) * scale,
        scale,
        stub,
      };
      segment.finish(extent);
      newly_ready.push(segment.slot());
    }

    if !newly_ready.is_empty() {
      debug!("{} segment(s) ready (init: {})", newly_ready.len(), is_init);
    }

    WindowChange {
      is_init,
      newly_ready,
      ready_run: self.ready_run(),
    }
  }

  /// Re-issues the load of the slot adjacent to current in `direction` if it
  /// failed.
  pub fn reload(&mut self, direction: Direction) -> bool {
    let Some(current) = self.current_index() else {
      return false;
    };
    let index = match direction {
      Direction::Left => current.checked_sub(1),
      Direction::Right => Some(current + 1).filter(|i| *i < self.slots.len()),
    };
    let Some(index) = index else {
      return false;
    };
    if self.slots[index].state() != SegmentState::Failed {
      return false;
    }
    self.issue_load(index);
    true
  }

  /// Re-issues loads for every failed slot. Returns how many.
  pub fn retry_failed(&mut self) -> usize {
    let failed: Vec<usize> = self
      .slots
      .iter()
      .enumerate()
      .filter(|(_, s)| s.state() == SegmentState::Failed)
      .map(|(i, _)| i)
      .collect();
    for &index in &failed {
      self.issue_load(index);
    }
    failed.len()
  }

  /// Unloads every slot.
  pub fn release_all(&mut self) {
    while !self.slots.is_empty() {
      self.remove_edge(Direction::Right);
    }
    self.pending.clear();
    self.current = None;
  }

  /// Maximal contiguous run of `Ready` slots containing the current slot.
  pub fn ready_run(&self) -> Option<RangeInclusive<usize>> {
    let current = self.current_index()?;
    if !self.slots[current].is_ready() {
      return None;
    }
    let mut lo = current;
    while lo > 0 && self.slots[lo - 1].is_ready() {
      lo -= 1;
    }
    let mut hi = current;
    while hi + 1 < self.slots.len() && self.slots[hi + 1].is_ready() {
      hi += 1;
    }
    Some(lo..=hi)
  }

  pub(crate) fn has_loading(&self) -> bool {
    self
      .slots
      .iter()
      .any(|s| s.state() == SegmentState::Loading)
  }

  pub(crate) fn failed_segments(&self) -> Vec<SegmentId> {
    self
      .slots
      .iter()
      .filter(|s| s.state() == SegmentState::Failed)
      .filter_map(|s| s.id().cloned())
      .collect()
  }

  pub(crate) fn complete_init(&mut self) {
    self.current = self.slots.get(self.behind).map(Segment::slot);
    self.init_phase = false;
  }

  pub fn drain_events(&mut self) -> Vec<WindowEvent> {
    std::mem::take(&mut self.events)
  }

  pub fn slots(&self) -> &[Segment] {
    &self.slots
  }

  pub fn get(&self, slot: SlotId) -> Option<&Segment> {
    self.index_of(slot).map(|i| &self.slots[i])
  }

  pub fn index_of(&self, slot: SlotId) -> Option<usize> {
    self.slots.iter().position(|s| s.slot() == slot)
  }

  pub fn contains(&self, slot: SlotId) -> bool {
    self.index_of(slot).is_some()
  }

  pub fn current(&self) -> Option<SlotId> {
    self.current
  }

  pub fn current_index(&self) -> Option<usize> {
    self.current.and_then(|slot| self.index_of(slot))
  }

  pub fn current_segment(&self) -> Option<&Segment> {
    self.current_index().map(|i| &self.slots[i])
  }

  /// Slot adjacent to current in `direction`.
  pub fn neighbor(&self, direction: Direction) -> Option<&Segment> {
    let current = self.current_index()?;
    match direction {
      Direction::Left => current.checked_sub(1).map(|i| &self.slots[i]),
      Direction::Right => self.slots.get(current + 1),
    }
  }

  /// Slot holding `segment`, if loaded into the window.
  pub fn find_segment(&self, segment: &SegmentId) -> Option<&Segment> {
    self.slots.iter().find(|s| s.id() == Some(segment))
  }

  pub fn is_full(&self) -> bool {
    self.slots.len() == self.behind + self.ahead + 1
  }

  pub fn is_init_phase(&self) -> bool {
    self.init_phase
  }

  pub fn pending_splices(&self) -> usize {
    self.pending.len()
  }

  pub fn behind(&self) -> usize {
    self.behind
  }

  pub fn ahead(&self) -> usize {
    self.ahead
  }

  pub fn catalog(&self) -> &dyn SegmentCatalog {
    self.catalog.as_ref()
  }

  pub fn loader(&self) -> &dyn SegmentLoader {
    self.loader.as_ref()
  }

  pub fn asset_name(&self, segment: &SegmentId) -> String {
    self.catalog.asset_name(segment)
  }

  fn allocate(&mut self, id: Option<SegmentId>) -> Segment {
    let slot = SlotId::new(self.next_slot);
    self.next_slot += 1;
    Segment::new(slot, id)
  }

  /// Appends the catalog neighbor of the edge slot on `direction`'s end and
  /// starts loading it. A placeholder edge yields another placeholder.
  fn push_edge(&mut self, direction: Direction) {
    let neighbor = match direction {
      Direction::Left => self
        .slots
        .first()
        .and_then(|s| s.id())
        .and_then(|id| self.catalog.previous_segment(id)),
      Direction::Right => self
        .slots
        .last()
        .and_then(|s| s.id())
        .and_then(|id| self.catalog.next_segment(id)),
    };
    let segment = self.allocate(neighbor);
    let index = match direction {
      Direction::Left => {
        self.slots.insert(0, segment);
        0
      }
      Direction::Right => {
        self.slots.push(segment);
        self.slots.len() - 1
      }
    };
    self.issue_load(index);
  }

  fn remove_edge(&mut self, direction: Direction) {
    let removed = match direction {
      Direction::Left if !self.slots.is_empty() => Some(self.slots.remove(0)),
      Direction::Left => None,
      Direction::Right => self.slots.pop(),
    };
    let Some(mut segment) = removed else {
      return;
    };

    if segment.release()
      && let Some(id) = segment.id()
    {
      let name = self.catalog.asset_name(id);
      debug!("unloading segment {} from {}", id, segment.slot());
      self.loader.unload(&name);
    }
    if self.current == Some(segment.slot()) {
      warn!("current slot {} left the window", segment.slot());
      self.current = None;
    }
    self.events.push(WindowEvent::Removed {
      slot: segment.slot(),
      segment: segment.id().cloned(),
    });
  }

  fn issue_load(&mut self, index: usize) {
    let Some(segment) = self.slots.get_mut(index) else {
      return;
    };
    let Some(id) = segment.id().cloned() else {
      return;
    };
    segment.begin_load();
    let needs_size = segment.size_bytes().is_none();
    let slot = segment.slot();
    let name = self.catalog.asset_name(&id);
    debug!("loading segment {} into {}", id, slot);
    self.loader.request_load(slot, &name);
    if needs_size {
      self.loader.request_size(slot, &name);
    }
  }
}
