//! Piecewise-linear keyframe curves used by the map animations.

use serde::{Deserialize, Serialize};

/// Keyframes as `[time, value]` pairs, sorted by time.
///
/// Sampling outside the keyed range clamps to the first/last value. An empty
/// curve samples to zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyframeCurve {
  keys: Vec<[f32; 2]>,
}

impl KeyframeCurve {
  pub fn new(mut keys: Vec<[f32; 2]>) -> Self {
    keys.sort_by(|a, b| a[0].total_cmp(&b[0]));
    Self { keys }
  }

  pub fn linear() -> Self {
    Self::new(vec![[0.0, 0.0], [1.0, 1.0]])
  }

  pub fn sample(&self, t: f32) -> f32 {
    let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
      return 0.0;
    };
    if t <= first[0] {
      return first[1];
    }
    if t >= last[0] {
      return last[1];
    }

    for pair in self.keys.windows(2) {
      let [t0, v0] = pair[0];
      let [t1, v1] = pair[1];
      if t <= t1 {
        let span = t1 - t0;
        if span <= f32::EPSILON {
          return v1;
        }
        return v0 + (v1 - v0) * (t - t0) / span;
      }
    }
    last[1]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn interpolates_between_keys() {
    let curve = KeyframeCurve::new(vec![[0.0, 0.0], [1.0, 10.0], [2.0, 0.0]]);
    assert_eq!(curve.sample(0.5), 5.0);
    assert_eq!(curve.sample(1.0), 10.0);
    assert_eq!(curve.sample(1.5), 5.0);
  }

  #[test]
  fn clamps_outside_range() {
    let curve = KeyframeCurve::new(vec![[1.0, 2.0], [0.0, -1.0]]);
    assert_eq!(curve.sample(-5.0), -1.0);
    assert_eq!(curve.sample(5.0), 2.0);
  }

  #[test]
  fn empty_curve_is_zero() {
    assert_eq!(KeyframeCurve::new(Vec::new()).sample(0.3), 0.0);
  }

  #[test]
  fn parses_from_toml_array() {
    #[derive(Deserialize)]
    struct Holder {
      curve: KeyframeCurve,
    }
    let holder: Holder = toml::from_str("curve = [[0.0, 1.0], [1.0, 0.0]]").unwrap();
    assert_eq!(holder.curve.sample(0.25), 0.75);
  }
}
