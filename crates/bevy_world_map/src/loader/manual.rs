//! Loader whose completions are pushed explicitly.
//!
//! Used by headless tools and tests: the caller decides when and how each
//! outstanding request finishes. Clones share state, so one handle can be
//! boxed into the window while another drives it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{LoadFailure, LoaderEvent, SegmentLoader, SegmentPayload};
use crate::window::SlotId;

#[derive(Default)]
struct ManualState {
  /// Every `request_load` in call order.
  load_requests: Vec<(SlotId, String)>,
  /// Loads not yet completed.
  outstanding: Vec<(SlotId, String)>,
  size_requests: Vec<(SlotId, String)>,
  unloads: Vec<String>,
  progress: HashMap<String, f32>,
  events: VecDeque<LoaderEvent>,
}

#[derive(Clone, Default)]
pub struct ManualLoader {
  state: Arc<Mutex<ManualState>>,
}

impl ManualLoader {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, ManualState> {
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Completes the oldest outstanding load of `name`. Returns false when
  /// nothing was outstanding.
  pub fn complete(&self, name: &str, payload: SegmentPayload) -> bool {
    self.finish(name, Ok(payload))
  }

  /// Fails the oldest outstanding load of `name`.
  pub fn fail(&self, name: &str, reason: &str) -> bool {
    self.finish(name, Err(LoadFailure::new(name, reason)))
  }

  fn finish(&self, name: &str, result: Result<SegmentPayload, LoadFailure>) -> bool {
    let mut state = self.lock();
    let Some(pos) = state.outstanding.iter().position(|(_, n)| n == name) else {
      return false;
    };
    let (ticket, _) = state.outstanding.remove(pos);
    state.progress.insert(name.to_string(), 1.0);
    state.events.push_back(LoaderEvent::Loaded { ticket, result });
    true
  }

  /// Answers every size request for `name` seen so far.
  pub fn report_size(&self, name: &str, bytes: u64) {
    let mut state = self.lock();
    let tickets: Vec<SlotId> = state
      .size_requests
      .iter()
      .filter(|(_, n)| n == name)
      .map(|(ticket, _)| *ticket)
      .collect();
    for ticket in tickets {
      state.events.push_back(LoaderEvent::Sized { ticket, bytes });
    }
  }

  pub fn set_progress(&self, name: &str, progress: f32) {
    self
      .lock()
      .progress
      .insert(name.to_string(), progress.clamp(0.0, 1.0));
  }

  /// Names passed to `request_load`, in call order.
  pub fn load_requests(&self) -> Vec<String> {
    self
      .lock()
      .load_requests
      .iter()
      .map(|(_, name)| name.clone())
      .collect()
  }

  pub fn outstanding(&self) -> Vec<String> {
    self
      .lock()
      .outstanding
      .iter()
      .map(|(_, name)| name.clone())
      .collect()
  }

  pub fn unloads(&self) -> Vec<String> {
    self.lock().unloads.clone()
  }

  /// Names passed to `request_size`, in call order.
  pub fn size_requests(&self) -> Vec<String> {
    self
      .lock()
      .size_requests
      .iter()
      .map(|(_, name)| name.clone())
      .collect()
  }

  pub fn clear_history(&self) {
    let mut state = self.lock();
    state.load_requests.clear();
    state.size_requests.clear();
    state.unloads.clear();
  }
}

impl SegmentLoader for ManualLoader {
  fn request_load(&mut self, ticket: SlotId, name: &str) {
    let mut state = self.lock();
    state.load_requests.push((ticket, name.to_string()));
    state.outstanding.push((ticket, name.to_string()));
    state.progress.insert(name.to_string(), 0.0);
  }

  fn request_size(&mut self, ticket: SlotId, name: &str) {
    self.lock().size_requests.push((ticket, name.to_string()));
  }

  fn progress(&self, name: &str) -> f32 {
    self.lock().progress.get(name).copied().unwrap_or(0.0)
  }

  fn unload(&mut self, name: &str) {
    let mut state = self.lock();
    state.unloads.push(name.to_string());
    state.progress.remove(name);
  }

  fn try_recv(&mut self) -> Option<LoaderEvent> {
    self.lock().events.pop_front()
  }
}
