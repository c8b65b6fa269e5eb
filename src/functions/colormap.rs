use std::collections::BTreeMap;

use tracing::debug;

use crate::functions::grid::Field;
use crate::SurfaceError;

/// Red, green, blue, alpha, each in `[0, 1]`.
pub type Rgba = [f32; 4];

/// Color used for NaN samples: transparent black.
pub const BAD_COLOR: Rgba = [0.0, 0.0, 0.0, 0.0];

/// Substrings of palette names that are hidden from users: qualitative,
/// reversed and grayscale ramps that add nothing on a surface.
pub const HIDDEN_PALETTES: &[&str] = &[
  "Accent", "Paired", "Dark", "Pastel", "tab", "Set", "flag", "_r", "gray",
  "Greys",
];

/// Named color ramp: piecewise-linear between anchor colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
  name: String,
  anchors: Vec<(f32, [f32; 3])>,
}

impl Colormap {
  /// Anchors must start at 0, end at 1 and increase strictly.
  fn new(name: &str, anchors: Vec<(f32, [f32; 3])>) -> Self {
    Colormap {
      name: name.to_string(),
      anchors,
    }
  }

  /// Evenly spaced anchors from `#rrggbb` strings.
  fn from_hex(name: &str, stops: &[&str]) -> Self {
    let last = (stops.len().max(2) - 1) as f32;
    let anchors = stops
      .iter()
      .enumerate()
      .map(|(i, hex)| (i as f32 / last, hex_to_rgb(hex)))
      .collect();
    Self::new(name, anchors)
  }

  fn reversed(&self) -> Self {
    let anchors = self
      .anchors
      .iter()
      .rev()
      .map(|(pos, rgb)| (1.0 - pos, *rgb))
      .collect();
    Self::new(&format!("{}_r", self.name), anchors)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Color at `t`. Values outside `[0, 1]` clamp to the ends, NaN maps to
  /// [`BAD_COLOR`].
  pub fn map(&self, t: f64) -> Rgba {
    if t.is_nan() {
      return BAD_COLOR;
    }
    let t = t.clamp(0.0, 1.0) as f32;
    let upper = self
      .anchors
      .iter()
      .position(|(pos, _)| *pos >= t)
      .unwrap_or(self.anchors.len() - 1);
    let (pos, [r, g, b]) = self.anchors[upper];
    if upper == 0 || pos == t {
      return [r, g, b, 1.0];
    }
    let (p0, c0) = self.anchors[upper - 1];
    let (p1, c1) = self.anchors[upper];
    let s = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
    let mix = |a: f32, b: f32| (a + (b - a) * s).clamp(0.0, 1.0);
    [mix(c0[0], c1[0]), mix(c0[1], c1[1]), mix(c0[2], c1[2]), 1.0]
  }
}

fn hex_to_rgb(hex: &str) -> [f32; 3] {
  let hex = hex.trim_start_matches('#');
  let channel = |i: usize| {
    hex
      .get(i..i + 2)
      .and_then(|h| u8::from_str_radix(h, 16).ok())
      .map_or(0.0, |v| v as f32 / 255.0)
  };
  [channel(0), channel(2), channel(4)]
}

/// Per-cell colors for a surface, same shape as the field they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorField {
  rows: usize,
  cols: usize,
  colors: Vec<Rgba>,
}

impl ColorField {
  pub fn shape(&self) -> (usize, usize) {
    (self.rows, self.cols)
  }

  pub fn colors(&self) -> &[Rgba] {
    &self.colors
  }

  pub fn get(&self, row: usize, col: usize) -> Option<Rgba> {
    if row < self.rows && col < self.cols {
      Some(self.colors[row * self.cols + col])
    } else {
      None
    }
  }
}

/// Map a scalar field to colors.
///
/// The field is normalized into `[0, 1]` by its finite min and max. A flat
/// field (and one with no finite values) has no usable range, so the ramp
/// is applied to the raw values instead of dividing by zero.
pub fn colorize(field: &Field, colormap: &Colormap) -> ColorField {
  let colors = match field.finite_range() {
    Some((min, max)) if max > min => {
      let span = max - min;
      field
        .values()
        .iter()
        .map(|v| colormap.map((v - min) / span))
        .collect()
    }
    _ => {
      debug!(
        colormap = colormap.name(),
        "flat field, colormap applied to raw values"
      );
      field.values().iter().map(|&v| colormap.map(v)).collect()
    }
  };
  let (rows, cols) = field.shape();
  ColorField { rows, cols, colors }
}

/// Every ramp known to the crate, before curation.
fn all_palettes() -> Vec<Colormap> {
  let base = vec![
    Colormap::from_hex(
      "viridis",
      &[
        "#440154", "#472c7a", "#3b518b", "#2c718e", "#21908d", "#27ad81",
        "#5cc863", "#aadc32", "#fde725",
      ],
    ),
    Colormap::from_hex(
      "inferno",
      &[
        "#000004", "#1f0c48", "#550f6d", "#88226a", "#ba3655", "#e35933",
        "#f98e09", "#f9cb35", "#fcffa4",
      ],
    ),
    Colormap::from_hex(
      "plasma",
      &[
        "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786", "#d8576b",
        "#ed7953", "#fb9f3a", "#fdca26", "#f0f921",
      ],
    ),
    Colormap::from_hex(
      "magma",
      &[
        "#000004", "#1c1044", "#4f127b", "#812581", "#b5367a", "#e55064",
        "#fb8761", "#fec287", "#fcfdbf",
      ],
    ),
    Colormap::from_hex(
      "cividis",
      &[
        "#00224e", "#123570", "#3b496c", "#575d6d", "#707173", "#8a8678",
        "#a59c74", "#c3b369", "#e1cc55", "#fee838",
      ],
    ),
    Colormap::from_hex(
      "twilight",
      &[
        "#e2d9e2", "#9ebbc9", "#6785be", "#5e43a5", "#2f1436", "#6d2350",
        "#b0604b", "#d0a79c", "#e2d9e2",
      ],
    ),
    Colormap::from_hex(
      "coolwarm",
      &[
        "#3b4cc0", "#6f92f3", "#aac7fd", "#dddddd", "#f7b89c", "#e7745b",
        "#b40426",
      ],
    ),
    Colormap::from_hex(
      "cubehelix",
      &[
        "#000000", "#1a1530", "#163d4e", "#1f6642", "#54792f", "#a07949",
        "#d07e93", "#cf9cda", "#c1caf3", "#ffffff",
      ],
    ),
    Colormap::new(
      "terrain",
      vec![
        (0.0, [0.2, 0.2, 0.6]),
        (0.15, [0.0, 0.6, 1.0]),
        (0.25, [0.0, 0.8, 0.4]),
        (0.5, [1.0, 1.0, 0.6]),
        (0.75, [0.5, 0.36, 0.33]),
        (1.0, [1.0, 1.0, 1.0]),
      ],
    ),
    Colormap::new(
      "ocean",
      vec![
        (0.0, [0.0, 0.5, 0.0]),
        (0.333, [0.0, 0.0, 0.333]),
        (0.667, [0.0, 0.5, 0.667]),
        (1.0, [1.0, 1.0, 1.0]),
      ],
    ),
    Colormap::new(
      "hot",
      vec![
        (0.0, [0.0416, 0.0, 0.0]),
        (0.365, [1.0, 0.0, 0.0]),
        (0.746, [1.0, 1.0, 0.0]),
        (1.0, [1.0, 1.0, 1.0]),
      ],
    ),
    Colormap::new(
      "jet",
      vec![
        (0.0, [0.0, 0.0, 0.5]),
        (0.11, [0.0, 0.0, 1.0]),
        (0.35, [0.0, 1.0, 1.0]),
        (0.65, [1.0, 1.0, 0.0]),
        (0.89, [1.0, 0.0, 0.0]),
        (1.0, [0.5, 0.0, 0.0]),
      ],
    ),
    Colormap::new(
      "rainbow",
      vec![
        (0.0, [0.5, 0.0, 1.0]),
        (0.25, [0.0, 0.7, 0.92]),
        (0.5, [0.5, 1.0, 0.7]),
        (0.75, [1.0, 0.7, 0.38]),
        (1.0, [1.0, 0.0, 0.0]),
      ],
    ),
    Colormap::new(
      "bone",
      vec![
        (0.0, [0.0, 0.0, 0.0]),
        (0.375, [0.319, 0.319, 0.444]),
        (0.75, [0.652, 0.777, 0.777]),
        (1.0, [1.0, 1.0, 1.0]),
      ],
    ),
    Colormap::new(
      "copper",
      vec![
        (0.0, [0.0, 0.0, 0.0]),
        (0.8, [1.0, 0.63, 0.4]),
        (1.0, [1.0, 0.78, 0.5]),
      ],
    ),
    Colormap::new(
      "cool",
      vec![(0.0, [0.0, 1.0, 1.0]), (1.0, [1.0, 0.0, 1.0])],
    ),
    Colormap::new(
      "spring",
      vec![(0.0, [1.0, 0.0, 1.0]), (1.0, [1.0, 1.0, 0.0])],
    ),
    Colormap::new(
      "summer",
      vec![(0.0, [0.0, 0.5, 0.4]), (1.0, [1.0, 1.0, 0.4])],
    ),
    Colormap::new(
      "autumn",
      vec![(0.0, [1.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 0.0])],
    ),
    Colormap::new(
      "winter",
      vec![(0.0, [0.0, 0.0, 1.0]), (1.0, [0.0, 1.0, 0.5])],
    ),
    Colormap::new("gray", vec![(0.0, [0.0; 3]), (1.0, [1.0; 3])]),
    Colormap::new("Greys", vec![(0.0, [1.0; 3]), (1.0, [0.0; 3])]),
    Colormap::from_hex("flag", &["#ff0000", "#ffffff", "#0000ff", "#000000"]),
    Colormap::from_hex("Pastel1", &["#fbb4ae", "#b3cde3", "#ccebc5", "#decbe4"]),
    Colormap::from_hex("Set1", &["#e41a1c", "#377eb8", "#4daf4a", "#984ea3"]),
    Colormap::from_hex("Dark2", &["#1b9e77", "#d95f02", "#7570b3", "#e7298a"]),
    Colormap::from_hex("Paired", &["#a6cee3", "#1f78b4", "#b2df8a", "#33a02c"]),
    Colormap::from_hex("Accent", &["#7fc97f", "#beaed4", "#fdc086", "#ffff99"]),
    Colormap::from_hex("tab10", &["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728"]),
  ];

  let reversed: Vec<Colormap> = base.iter().map(Colormap::reversed).collect();
  base.into_iter().chain(reversed).collect()
}

fn is_hidden(name: &str) -> bool {
  HIDDEN_PALETTES.iter().any(|pattern| name.contains(pattern))
}

/// Lookup table of colormaps by name.
#[derive(Debug, Clone)]
pub struct ColormapCatalog {
  maps: BTreeMap<String, Colormap>,
}

impl Default for ColormapCatalog {
  fn default() -> Self {
    Self::curated()
  }
}

impl ColormapCatalog {
  /// Catalog offered to users, without the hidden palettes.
  pub fn curated() -> Self {
    let maps = all_palettes()
      .into_iter()
      .filter(|map| !is_hidden(map.name()))
      .map(|map| (map.name().to_string(), map))
      .collect();
    ColormapCatalog { maps }
  }

  /// Every palette, including the hidden ones.
  pub fn unfiltered() -> Self {
    let maps = all_palettes()
      .into_iter()
      .map(|map| (map.name().to_string(), map))
      .collect();
    ColormapCatalog { maps }
  }

  pub fn get(&self, name: &str) -> Result<&Colormap, SurfaceError> {
    self
      .maps
      .get(name)
      .ok_or_else(|| SurfaceError::UnknownColormap(name.to_string()))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.maps.contains_key(name)
  }

  /// Sorted palette names.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.maps.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.maps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.maps.is_empty()
  }
}
