//! File-backed segment loader using a dedicated thread and async-channel.
//!
//! Segment `name` resolves to `<dir>/<name>.segment.toml`. The worker reads
//! the file in blocks so progress can be reported while a (possibly slow)
//! read is in flight.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_channel::{Receiver, Sender, TryRecvError};

use super::{LoadFailure, LoaderEvent, SegmentLoader, SegmentPayload};
use crate::window::SlotId;

const READ_BLOCK: usize = 4096;

enum LoadCommand {
  Load { ticket: SlotId, name: String },
  Size { ticket: SlotId, name: String },
}

type ProgressMap = Arc<RwLock<HashMap<String, f32>>>;

/// Loads segment descriptors from a directory on a background thread.
pub struct FileSegmentLoader {
  cmd_tx: Sender<LoadCommand>,
  result_rx: Receiver<LoaderEvent>,
  progress: ProgressMap,
  /// Outstanding references per name.
  refs: HashMap<String, u32>,
  _worker_handle: JoinHandle<()>,
}

impl FileSegmentLoader {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self::with_latency(dir, Duration::ZERO)
  }

  /// Spreads `latency` over each read, simulating a slow download.
  pub fn with_latency(dir: impl Into<PathBuf>, latency: Duration) -> Self {
    let dir = dir.into();
    let (cmd_tx, cmd_rx) = async_channel::unbounded::<LoadCommand>();
    let (result_tx, result_rx) = async_channel::unbounded::<LoaderEvent>();
    let progress: ProgressMap = Arc::default();

    let worker_progress = progress.clone();
    let worker_handle = thread::spawn(move || {
      worker_loop(dir, latency, cmd_rx, result_tx, worker_progress);
    });

    Self {
      cmd_tx,
      result_rx,
      progress,
      refs: HashMap::new(),
      _worker_handle: worker_handle,
    }
  }

  fn send(&self, cmd: LoadCommand) {
    if self.cmd_tx.send_blocking(cmd).is_err() {
      log::error!("segment loader worker is gone");
    }
  }

  /// Number of outstanding references to `name`.
  pub fn ref_count(&self, name: &str) -> u32 {
    self.refs.get(name).copied().unwrap_or(0)
  }
}

impl SegmentLoader for FileSegmentLoader {
  fn request_load(&mut self, ticket: SlotId, name: &str) {
    *self.refs.entry(name.to_string()).or_insert(0) += 1;
    set_progress(&self.progress, name, 0.0);
    self.send(LoadCommand::Load {
      ticket,
      name: name.to_string(),
    });
  }

  fn request_size(&mut self, ticket: SlotId, name: &str) {
    self.send(LoadCommand::Size {
      ticket,
      name: name.to_string(),
    });
  }

  fn progress(&self, name: &str) -> f32 {
    self
      .progress
      .read()
      .ok()
      .and_then(|map| map.get(name).copied())
      .unwrap_or(0.0)
  }

  fn unload(&mut self, name: &str) {
    let Some(count) = self.refs.get_mut(name) else {
      log::warn!("unload of '{}' without a matching load", name);
      return;
    };
    *count -= 1;
    if *count == 0 {
      self.refs.remove(name);
      if let Ok(mut map) = self.progress.write() {
        map.remove(name);
      }
      log::debug!("released segment '{}'", name);
    }
  }

  fn try_recv(&mut self) -> Option<LoaderEvent> {
    match self.result_rx.try_recv() {
      Ok(event) => Some(event),
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Closed) => None,
    }
  }
}

fn set_progress(progress: &ProgressMap, name: &str, value: f32) {
  if let Ok(mut map) = progress.write() {
    map.insert(name.to_string(), value);
  }
}

fn segment_path(dir: &Path, name: &str) -> PathBuf {
  dir.join(format!("{name}.segment.toml"))
}

/// Main worker loop running in the dedicated thread. Exits once the loader
/// (and with it the command sender) is dropped.
fn worker_loop(
  dir: PathBuf,
  latency: Duration,
  cmd_rx: Receiver<LoadCommand>,
  result_tx: Sender<LoaderEvent>,
  progress: ProgressMap,
) {
  while let Ok(cmd) = cmd_rx.recv_blocking() {
    let event = match cmd {
      LoadCommand::Load { ticket, name } => {
        let result = read_segment(&dir, &name, latency, &progress);
        if let Err(failure) = &result {
          log::warn!("{}", failure);
        }
        Some(LoaderEvent::Loaded { ticket, result })
      }
      LoadCommand::Size { ticket, name } => match std::fs::metadata(segment_path(&dir, &name)) {
        Ok(meta) => Some(LoaderEvent::Sized {
          ticket,
          bytes: meta.len(),
        }),
        Err(e) => {
          log::debug!("no size for segment '{}': {}", name, e);
          None
        }
      },
    };

    if let Some(event) = event
      && result_tx.send_blocking(event).is_err()
    {
      break;
    }
  }
}

fn read_segment(
  dir: &Path,
  name: &str,
  latency: Duration,
  progress: &ProgressMap,
) -> Result<SegmentPayload, LoadFailure> {
  let path = segment_path(dir, name);
  let mut file = File::open(&path).map_err(|e| LoadFailure::new(name, e))?;
  let len = file.metadata().map_err(|e| LoadFailure::new(name, e))?.len() as usize;

  let blocks = len.div_ceil(READ_BLOCK).max(1);
  let pause = latency / blocks as u32;
  let mut bytes = Vec::with_capacity(len);
  let mut block = [0u8; READ_BLOCK];

  loop {
    let read = file.read(&mut block).map_err(|e| LoadFailure::new(name, e))?;
    if read == 0 {
      break;
    }
    bytes.extend_from_slice(&block[..read]);
    if !pause.is_zero() {
      thread::sleep(pause);
    }
    if len > 0 {
      set_progress(progress, name, (bytes.len() as f32 / len as f32).min(1.0));
    }
  }

  let source = String::from_utf8(bytes).map_err(|e| LoadFailure::new(name, e))?;
  let payload: SegmentPayload = toml::from_str(&source).map_err(|e| LoadFailure::new(name, e))?;
  if payload.width <= 0.0 || payload.height <= 0.0 {
    return Err(LoadFailure::new(name, "segment has no extent"));
  }

  set_progress(progress, name, 1.0);
  Ok(payload)
}

#[cfg(test)]
mod tests {
  use std::time::Instant;

  use super::*;

  const MEADOW: &str = r#"
width = 1280.0
height = 720.0
leading_stub = 64.0

[[buttons]]
level = 1
x = 300.0
y = 200.0
"#;

  fn wait_event(loader: &mut FileSegmentLoader) -> LoaderEvent {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
      if let Some(event) = loader.try_recv() {
        return event;
      }
      assert!(Instant::now() < deadline, "loader produced no event");
      thread::sleep(Duration::from_millis(5));
    }
  }

  #[test]
  fn loads_descriptor_and_reports_size() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("meadow.segment.toml"), MEADOW).unwrap();
    let mut loader = FileSegmentLoader::new(dir.path());

    loader.request_load(SlotId::new(7), "meadow");
    loader.request_size(SlotId::new(7), "meadow");

    let LoaderEvent::Loaded { ticket, result } = wait_event(&mut loader) else {
      panic!("expected the load first");
    };
    assert_eq!(ticket, SlotId::new(7));
    let payload = result.unwrap();
    assert_eq!(payload.leading_stub, 64.0);
    assert_eq!(payload.buttons.len(), 1);
    assert_eq!(loader.progress("meadow"), 1.0);

    let LoaderEvent::Sized { bytes, .. } = wait_event(&mut loader) else {
      panic!("expected a size");
    };
    assert_eq!(bytes, MEADOW.len() as u64);
  }

  #[test]
  fn malformed_or_missing_descriptor_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.segment.toml"), "width = 0.0\nheight = 10.0\n").unwrap();
    let mut loader = FileSegmentLoader::new(dir.path());

    loader.request_load(SlotId::new(1), "broken");
    loader.request_load(SlotId::new(2), "absent");
    for _ in 0..2 {
      let LoaderEvent::Loaded { result, .. } = wait_event(&mut loader) else {
        panic!("expected a load result");
      };
      assert!(result.is_err());
    }

    // no size event for a missing file
    loader.request_size(SlotId::new(2), "absent");
    thread::sleep(Duration::from_millis(50));
    assert!(loader.try_recv().is_none());
  }

  #[test]
  fn unload_counts_references() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("meadow.segment.toml"), MEADOW).unwrap();
    let mut loader = FileSegmentLoader::new(dir.path());

    loader.request_load(SlotId::new(1), "meadow");
    loader.request_load(SlotId::new(2), "meadow");
    assert_eq!(loader.ref_count("meadow"), 2);

    loader.unload("meadow");
    assert_eq!(loader.ref_count("meadow"), 1);
    loader.unload("meadow");
    assert_eq!(loader.ref_count("meadow"), 0);
    loader.unload("meadow");
    assert_eq!(loader.ref_count("meadow"), 0);
  }

  #[test]
  fn failed_then_retried_load_is_fully_released() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = FileSegmentLoader::new(dir.path());

    loader.request_load(SlotId::new(3), "meadow");
    let LoaderEvent::Loaded { result, .. } = wait_event(&mut loader) else {
      panic!("expected a load result");
    };
    assert!(result.is_err());
    // the window gives a failed attempt's reference back right away
    loader.unload("meadow");
    assert_eq!(loader.ref_count("meadow"), 0);

    std::fs::write(dir.path().join("meadow.segment.toml"), MEADOW).unwrap();
    loader.request_load(SlotId::new(3), "meadow");
    let LoaderEvent::Loaded { result, .. } = wait_event(&mut loader) else {
      panic!("expected a load result");
    };
    assert!(result.is_ok());
    assert_eq!(loader.ref_count("meadow"), 1);

    loader.unload("meadow");
    assert_eq!(loader.ref_count("meadow"), 0);
    assert_eq!(loader.progress("meadow"), 0.0);
  }
}
