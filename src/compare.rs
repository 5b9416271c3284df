//! Pixel-level image comparison
//!
//! Pure function over two RGBA buffers. Pixels are compared per channel
//! against a color-distance tolerance; pixels flagged by the pixelmatch-style
//! anti-aliasing heuristic are excluded from the diff count unless requested.
//! Mismatched dimensions either fail or are normalized by deterministic
//! nearest-neighbor resampling, depending on configuration.
//!
//! The comparator never decides pass/fail: callers gate the resulting diff
//! percentage against their own aggregate threshold, which is configured
//! independently of the per-pixel tolerance.

use crate::error::CompareError;
use image::Rgba;
use image::RgbaImage;
use std::borrow::Cow;

/// Differing pixels are painted solid red in the diff image.
const DIFF_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
/// Excluded anti-aliased pixels are painted yellow for context.
const AA_COLOR: Rgba<u8> = Rgba([255, 220, 0, 255]);

/// Knobs for a single comparison.
#[derive(Debug, Clone)]
pub struct CompareOptions {
  /// Per-channel color-distance tolerance in 0-1 (scaled to 0-255 internally).
  pub pixel_tolerance: f64,
  /// Count anti-aliased pixels as differences instead of excluding them.
  pub include_anti_aliased: bool,
  /// Resample both inputs to the max of their dimensions instead of failing
  /// on a mismatch.
  pub scale_to_same_size: bool,
}

impl Default for CompareOptions {
  fn default() -> Self {
    CompareOptions {
      pixel_tolerance: 0.1,
      include_anti_aliased: false,
      scale_to_same_size: true,
    }
  }
}

/// Result of comparing two buffers.
#[derive(Debug, Clone, Default)]
pub struct ComparisonOutcome {
  /// Pixels that differ beyond tolerance (anti-aliased exclusions not counted)
  pub diff_pixels: u64,
  /// Width x height of the (possibly normalized) comparison area
  pub total_pixels: u64,
  /// Pixels that differed but were excluded as anti-aliasing artifacts
  pub anti_aliased_pixels: u64,
  /// Highlight image, present only when at least one pixel differs
  pub diff_image: Option<RgbaImage>,
}

impl ComparisonOutcome {
  /// Differing pixels as a percentage of the comparison area (0-100).
  pub fn diff_percent(&self) -> f64 {
    if self.total_pixels == 0 {
      0.0
    } else {
      (self.diff_pixels as f64 / self.total_pixels as f64) * 100.0
    }
  }
}

/// Compare a baseline buffer against a current capture.
///
/// Deterministic: identical inputs and options always produce the same counts
/// and the same diff image.
pub fn compare(
  baseline: &RgbaImage,
  current: &RgbaImage,
  options: &CompareOptions,
) -> Result<ComparisonOutcome, CompareError> {
  let (bw, bh) = baseline.dimensions();
  let (cw, ch) = current.dimensions();

  let (a, b): (Cow<RgbaImage>, Cow<RgbaImage>) = if (bw, bh) == (cw, ch) {
    (Cow::Borrowed(baseline), Cow::Borrowed(current))
  } else if !options.scale_to_same_size {
    return Err(CompareError::DimensionMismatch {
      baseline_width: bw,
      baseline_height: bh,
      current_width: cw,
      current_height: ch,
    });
  } else {
    let width = bw.max(cw);
    let height = bh.max(ch);
    (
      Cow::Owned(resample_nearest(baseline, width, height)),
      Cow::Owned(resample_nearest(current, width, height)),
    )
  };

  let (width, height) = a.dimensions();
  let total_pixels = width as u64 * height as u64;
  let tolerance = (options.pixel_tolerance.clamp(0.0, 1.0) * 255.0).round() as i16;

  let mut diff_pixels = 0u64;
  let mut anti_aliased_pixels = 0u64;
  let mut diff_image = RgbaImage::new(width, height);

  for y in 0..height {
    for x in 0..width {
      let pa = a.get_pixel(x, y);
      let pb = b.get_pixel(x, y);
      let differs = (0..4).any(|c| (pa[c] as i16 - pb[c] as i16).abs() > tolerance);
      if !differs {
        continue;
      }
      if !options.include_anti_aliased
        && (is_anti_aliased(&a, &b, x, y) || is_anti_aliased(&b, &a, x, y))
      {
        anti_aliased_pixels += 1;
        diff_image.put_pixel(x, y, AA_COLOR);
      } else {
        diff_pixels += 1;
        diff_image.put_pixel(x, y, DIFF_COLOR);
      }
    }
  }

  Ok(ComparisonOutcome {
    diff_pixels,
    total_pixels,
    anti_aliased_pixels,
    diff_image: (diff_pixels > 0).then_some(diff_image),
  })
}

/// Resample to `width` x `height` with nearest-neighbor mapping.
///
/// Source coordinates are `floor(dst * src_dim / dst_dim)` in integer
/// arithmetic, no interpolation, so normalization is bit-exact across
/// platforms and runs.
pub fn resample_nearest(source: &RgbaImage, width: u32, height: u32) -> RgbaImage {
  let (sw, sh) = source.dimensions();
  if (sw, sh) == (width, height) {
    return source.clone();
  }
  let mut out = RgbaImage::new(width, height);
  for y in 0..height {
    let sy = ((y as u64 * sh as u64) / height as u64) as u32;
    for x in 0..width {
      let sx = ((x as u64 * sw as u64) / width as u64) as u32;
      out.put_pixel(x, y, *source.get_pixel(sx, sy));
    }
  }
  out
}

fn luma(px: &Rgba<u8>) -> f64 {
  0.2126 * px[0] as f64 + 0.7152 * px[1] as f64 + 0.0722 * px[2] as f64
}

/// Pixelmatch anti-aliasing heuristic.
///
/// A pixel is an anti-aliasing artifact when, among its 3x3 neighborhood in
/// `source`, it has both a darker and a brighter neighbor, at most two
/// equal-luma neighbors, and its darkest or brightest neighbor sits inside a
/// flat region (many identical siblings) in both images.
fn is_anti_aliased(source: &RgbaImage, other: &RgbaImage, x: u32, y: u32) -> bool {
  let (width, height) = source.dimensions();
  let x0 = x.saturating_sub(1);
  let y0 = y.saturating_sub(1);
  let x1 = (x + 1).min(width - 1);
  let y1 = (y + 1).min(height - 1);

  // An edge position counts as one equal sibling.
  let mut zeroes = if x == x0 || x == x1 || y == y0 || y == y1 {
    1
  } else {
    0
  };
  let center = luma(source.get_pixel(x, y));
  let mut min_delta = 0.0f64;
  let mut max_delta = 0.0f64;
  let mut min_pos = (x, y);
  let mut max_pos = (x, y);

  for ny in y0..=y1 {
    for nx in x0..=x1 {
      if nx == x && ny == y {
        continue;
      }
      let delta = luma(source.get_pixel(nx, ny)) - center;
      if delta == 0.0 {
        zeroes += 1;
        if zeroes > 2 {
          return false;
        }
      } else if delta < min_delta {
        min_delta = delta;
        min_pos = (nx, ny);
      } else if delta > max_delta {
        max_delta = delta;
        max_pos = (nx, ny);
      }
    }
  }

  // Needs both a darker and a brighter neighbor to be an edge artifact.
  if min_delta == 0.0 || max_delta == 0.0 {
    return false;
  }

  (has_many_siblings(source, min_pos.0, min_pos.1) && has_many_siblings(other, min_pos.0, min_pos.1))
    || (has_many_siblings(source, max_pos.0, max_pos.1)
      && has_many_siblings(other, max_pos.0, max_pos.1))
}

/// True when more than two of the pixel's neighbors are identical to it.
fn has_many_siblings(image: &RgbaImage, x: u32, y: u32) -> bool {
  let (width, height) = image.dimensions();
  let x0 = x.saturating_sub(1);
  let y0 = y.saturating_sub(1);
  let x1 = (x + 1).min(width - 1);
  let y1 = (y + 1).min(height - 1);

  let mut zeroes = if x == x0 || x == x1 || y == y0 || y == y1 {
    1
  } else {
    0
  };
  let center = image.get_pixel(x, y);

  for ny in y0..=y1 {
    for nx in x0..=x1 {
      if nx == x && ny == y {
        continue;
      }
      if image.get_pixel(nx, ny) == center {
        zeroes += 1;
        if zeroes > 2 {
          return true;
        }
      }
    }
  }
  false
}

#[cfg(test)]
mod tests {
  use super::*;

  const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
  const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

  fn strict() -> CompareOptions {
    CompareOptions {
      pixel_tolerance: 0.0,
      include_anti_aliased: false,
      scale_to_same_size: false,
    }
  }

  /// Vertical edge: black to white with a gray anti-aliased seam in column 2.
  fn edge_image(seam: u8) -> RgbaImage {
    RgbaImage::from_fn(5, 5, |x, _| match x {
      0 | 1 => Rgba([0, 0, 0, 255]),
      2 => Rgba([seam, seam, seam, 255]),
      _ => Rgba([255, 255, 255, 255]),
    })
  }

  #[test]
  fn identical_images_have_zero_diff() {
    let img = RgbaImage::from_pixel(10, 10, RED);
    let outcome = compare(&img, &img, &strict()).unwrap();
    assert_eq!(outcome.diff_pixels, 0);
    assert_eq!(outcome.total_pixels, 100);
    assert_eq!(outcome.diff_percent(), 0.0);
    assert!(outcome.diff_image.is_none());
  }

  #[test]
  fn single_changed_pixel_is_counted_exactly() {
    let baseline = RgbaImage::from_pixel(10, 10, RED);
    let mut current = baseline.clone();
    current.put_pixel(4, 4, BLUE);

    let outcome = compare(&baseline, &current, &strict()).unwrap();
    assert_eq!(outcome.diff_pixels, 1);
    assert_eq!(outcome.total_pixels, 100);
    assert_eq!(outcome.diff_percent(), 1.0);
    let diff = outcome.diff_image.expect("diff image for differing inputs");
    assert_eq!(*diff.get_pixel(4, 4), DIFF_COLOR);
    assert_eq!(*diff.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
  }

  #[test]
  fn exact_pixel_counts_for_synthetic_fixtures() {
    let baseline = RgbaImage::from_pixel(10, 10, RED);
    for k in [2u32, 5, 9] {
      let mut current = baseline.clone();
      for i in 0..k {
        // Spread along the diagonal so changed pixels stay isolated.
        current.put_pixel(i, i, BLUE);
      }
      let outcome = compare(&baseline, &current, &strict()).unwrap();
      assert_eq!(outcome.diff_pixels, k as u64);
    }
  }

  #[test]
  fn more_differing_pixels_never_decrease_percentage() {
    let baseline = RgbaImage::from_pixel(10, 10, RED);
    let mut previous = 0.0;
    for k in 0..=10u32 {
      let mut current = baseline.clone();
      for i in 0..k {
        current.put_pixel(i, i, BLUE);
      }
      let percent = compare(&baseline, &current, &strict()).unwrap().diff_percent();
      assert!(percent >= previous, "{percent} < {previous} at k={k}");
      previous = percent;
    }
  }

  #[test]
  fn tolerance_absorbs_small_channel_deltas() {
    let baseline = RgbaImage::from_pixel(4, 4, Rgba([100, 100, 100, 255]));
    let current = RgbaImage::from_pixel(4, 4, Rgba([110, 110, 110, 255]));

    let outcome = compare(&baseline, &current, &strict()).unwrap();
    assert_eq!(outcome.diff_pixels, 16);

    let lenient = CompareOptions {
      pixel_tolerance: 0.05, // 12.75 of 255 per channel
      ..strict()
    };
    let outcome = compare(&baseline, &current, &lenient).unwrap();
    assert_eq!(outcome.diff_pixels, 0);
    assert!(outcome.diff_image.is_none());
  }

  #[test]
  fn dimension_mismatch_fails_when_scaling_disabled() {
    let baseline = RgbaImage::from_pixel(4, 4, RED);
    let current = RgbaImage::from_pixel(8, 8, RED);
    let err = compare(&baseline, &current, &strict()).unwrap_err();
    assert!(matches!(
      err,
      CompareError::DimensionMismatch {
        baseline_width: 4,
        current_width: 8,
        ..
      }
    ));
  }

  #[test]
  fn scaling_normalizes_to_max_dimensions() {
    let baseline = RgbaImage::from_pixel(2, 2, RED);
    let current = RgbaImage::from_pixel(4, 4, RED);
    let options = CompareOptions {
      scale_to_same_size: true,
      ..strict()
    };
    let outcome = compare(&baseline, &current, &options).unwrap();
    assert_eq!(outcome.total_pixels, 16);
    assert_eq!(outcome.diff_pixels, 0);
  }

  #[test]
  fn nearest_neighbor_upscale_is_exact() {
    let mut source = RgbaImage::new(2, 1);
    source.put_pixel(0, 0, RED);
    source.put_pixel(1, 0, BLUE);
    let scaled = resample_nearest(&source, 4, 1);
    assert_eq!(*scaled.get_pixel(0, 0), RED);
    assert_eq!(*scaled.get_pixel(1, 0), RED);
    assert_eq!(*scaled.get_pixel(2, 0), BLUE);
    assert_eq!(*scaled.get_pixel(3, 0), BLUE);
  }

  #[test]
  fn anti_aliased_seam_is_excluded_by_default() {
    let baseline = edge_image(128);
    let current = edge_image(100);

    let outcome = compare(&baseline, &current, &strict()).unwrap();
    assert_eq!(outcome.diff_pixels, 0);
    assert_eq!(outcome.anti_aliased_pixels, 5);
    assert_eq!(outcome.diff_percent(), 0.0);
    assert!(outcome.diff_image.is_none());
  }

  #[test]
  fn anti_aliased_seam_counts_when_included() {
    let baseline = edge_image(128);
    let current = edge_image(100);
    let options = CompareOptions {
      include_anti_aliased: true,
      ..strict()
    };
    let outcome = compare(&baseline, &current, &options).unwrap();
    assert_eq!(outcome.diff_pixels, 5);
    assert_eq!(outcome.anti_aliased_pixels, 0);
    assert!(outcome.diff_image.is_some());
  }

  #[test]
  fn isolated_change_is_not_mistaken_for_anti_aliasing() {
    // A lone bright pixel in a flat region has no darker neighbor, so the
    // heuristic must not swallow it.
    let baseline = RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 255]));
    let mut current = baseline.clone();
    current.put_pixel(2, 2, Rgba([255, 255, 255, 255]));
    let outcome = compare(&baseline, &current, &strict()).unwrap();
    assert_eq!(outcome.diff_pixels, 1);
    assert_eq!(outcome.anti_aliased_pixels, 0);
  }

  #[test]
  fn comparison_is_deterministic() {
    let baseline = edge_image(128);
    let mut current = edge_image(100);
    current.put_pixel(4, 4, BLUE);
    let first = compare(&baseline, &current, &strict()).unwrap();
    let second = compare(&baseline, &current, &strict()).unwrap();
    assert_eq!(first.diff_pixels, second.diff_pixels);
    assert_eq!(
      first.diff_image.as_ref().map(|i| i.as_raw().clone()),
      second.diff_image.as_ref().map(|i| i.as_raw().clone())
    );
  }
}
