//! Resumable window initialization.

use std::fmt;

use bevy::log::{info, warn};

use super::SegmentWindow;
use crate::catalog::SegmentId;

/// Answer to a retry prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
  Retry,
  Abort,
}

/// Result of one [`InitTask::poll`].
#[derive(Clone, Debug, PartialEq)]
pub enum InitPoll {
  /// Loads still in flight, or a prompt is waiting for its decision.
  Pending,
  /// Loads settled with failures. Emitted once per settle; answer with
  /// [`InitTask::decide`].
  Prompt(Vec<SegmentId>),
  /// Every assigned slot is spliced in. The center slot is current.
  Complete,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InitError {
  /// The player declined to retry.
  Aborted { failed: Vec<SegmentId> },
}

impl fmt::Display for InitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      InitError::Aborted { failed } => {
        write!(f, "map initialization aborted with {} failed segment(s)", failed.len())
      }
    }
  }
}

impl std::error::Error for InitError {}

#[derive(Debug)]
enum InitPhase {
  Waiting,
  Prompted(Vec<SegmentId>),
  Complete,
  Aborted(Vec<SegmentId>),
}

/// State machine returned by [`SegmentWindow::initialize`], polled once per
/// frame.
#[derive(Debug)]
pub struct InitTask {
  phase: InitPhase,
  retries: u32,
}

impl InitTask {
  pub(crate) fn new() -> Self {
    Self {
      phase: InitPhase::Waiting,
      retries: 0,
    }
  }

  pub fn poll(&mut self, window: &mut SegmentWindow) -> Result<InitPoll, InitError> {
    match &self.phase {
      InitPhase::Complete => return Ok(InitPoll::Complete),
      InitPhase::Prompted(_) => return Ok(InitPoll::Pending),
      InitPhase::Aborted(failed) => {
        return Err(InitError::Aborted {
          failed: failed.clone(),
        });
      }
      InitPhase::Waiting => {}
    }

    if window.has_loading() {
      return Ok(InitPoll::Pending);
    }

    let failed = window.failed_segments();
    if !failed.is_empty() {
      warn!("{} segment(s) failed to load during map init", failed.len());
      self.phase = InitPhase::Prompted(failed.clone());
      return Ok(InitPoll::Prompt(failed));
    }

    window.complete_init();
    self.phase = InitPhase::Complete;
    info!("map window initialized after {} retries", self.retries);
    Ok(InitPoll::Complete)
  }

  /// Applies the player's answer. Returns `Err` on abort; the window is then
  /// unusable until initialized again.
  pub fn decide(
    &mut self,
    window: &mut SegmentWindow,
    decision: RetryDecision,
  ) -> Result<(), InitError> {
    let InitPhase::Prompted(failed) = &self.phase else {
      warn!("retry decision {:?} without a pending prompt", decision);
      return Ok(());
    };

    match decision {
      RetryDecision::Retry => {
        let reissued = window.retry_failed();
        info!("retrying {} failed segment(s)", reissued);
        self.retries += 1;
        self.phase = InitPhase::Waiting;
        Ok(())
      }
      RetryDecision::Abort => {
        let failed = failed.clone();
        self.phase = InitPhase::Aborted(failed.clone());
        Err(InitError::Aborted { failed })
      }
    }
  }

  pub fn is_awaiting_decision(&self) -> bool {
    matches!(self.phase, InitPhase::Prompted(_))
  }

  pub fn is_complete(&self) -> bool {
    matches!(self.phase, InitPhase::Complete)
  }
}
