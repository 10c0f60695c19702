use serde::{Deserialize, Serialize};

use crate::error::EaselError;

/// Axis-aligned pixel rectangle, top-left origin, y increasing downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Smallest box enclosing both rectangles.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    /// Smallest box enclosing every input. Order-independent; rejects an
    /// empty list rather than inventing a degenerate rectangle.
    pub fn union_all(boxes: &[BoundingBox]) -> Result<BoundingBox, EaselError> {
        let (first, rest) = boxes.split_first().ok_or_else(|| {
            EaselError::InvalidArgument("union requires at least one bounding box".to_string())
        })?;
        Ok(rest.iter().fold(*first, |acc, bbox| acc.union(bbox)))
    }

    /// Grows the box by `margin` pixels on every side. The left/top edges
    /// saturate at 0; width/height grow by whatever was actually subtracted
    /// plus the trailing margin, so the covered area never shrinks.
    pub fn expand(&self, margin: i64) -> Result<BoundingBox, EaselError> {
        if margin < 0 {
            return Err(EaselError::InvalidArgument(format!(
                "expand margin must be non-negative, got {margin}"
            )));
        }
        let margin = u32::try_from(margin).unwrap_or(u32::MAX);
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        let w = self
            .w
            .saturating_add(self.x - x)
            .saturating_add(margin);
        let h = self
            .h
            .saturating_add(self.y - y)
            .saturating_add(margin);
        Ok(BoundingBox::new(x, y, w, h))
    }

    /// Clamps the box fully inside an image of the given dimensions. The
    /// result always has strictly positive area; a zero-area input collapses
    /// to a 1x1 box at its clamped origin.
    pub fn clamp(&self, image_w: u32, image_h: u32) -> Result<BoundingBox, EaselError> {
        if image_w == 0 || image_h == 0 {
            return Err(EaselError::InvalidArgument(format!(
                "cannot clamp to a {image_w}x{image_h} image"
            )));
        }
        let x = self.x.min(image_w - 1);
        let y = self.y.min(image_h - 1);
        let w = self.w.clamp(1, image_w - x);
        let h = self.h.clamp(1, image_h - y);
        Ok(BoundingBox::new(x, y, w, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_boxes() -> Vec<BoundingBox> {
        vec![
            BoundingBox::new(10, 20, 30, 40),
            BoundingBox::new(5, 90, 10, 10),
            BoundingBox::new(200, 15, 50, 5),
            BoundingBox::new(12, 22, 1, 1),
        ]
    }

    #[test]
    fn union_all_contains_every_input() -> anyhow::Result<()> {
        let boxes = sample_boxes();
        let merged = BoundingBox::union_all(&boxes)?;
        for bbox in &boxes {
            assert!(merged.contains(bbox), "{merged:?} should contain {bbox:?}");
        }
        assert_eq!(merged, BoundingBox::new(5, 15, 245, 85));
        Ok(())
    }

    #[test]
    fn union_all_is_order_independent() -> anyhow::Result<()> {
        let mut boxes = sample_boxes();
        let expected = BoundingBox::union_all(&boxes)?;
        for _ in 0..boxes.len() {
            boxes.rotate_left(1);
            assert_eq!(BoundingBox::union_all(&boxes)?, expected);
        }
        boxes.reverse();
        assert_eq!(BoundingBox::union_all(&boxes)?, expected);
        Ok(())
    }

    #[test]
    fn union_all_rejects_empty_input() {
        let err = BoundingBox::union_all(&[]).unwrap_err();
        assert!(matches!(err, EaselError::InvalidArgument(_)));
    }

    #[test]
    fn expand_rejects_negative_margin() {
        let err = BoundingBox::new(10, 10, 5, 5).expand(-1).unwrap_err();
        assert!(matches!(err, EaselError::InvalidArgument(_)));
    }

    #[test]
    fn expand_saturates_at_the_origin() -> anyhow::Result<()> {
        let grown = BoundingBox::new(5, 3, 10, 10).expand(8)?;
        assert_eq!(grown, BoundingBox::new(0, 0, 23, 21));
        Ok(())
    }

    #[test]
    fn clamp_keeps_positive_area_inside_the_image() -> anyhow::Result<()> {
        let clamped = BoundingBox::new(150, 150, 0, 0).clamp(100, 100)?;
        assert_eq!(clamped, BoundingBox::new(99, 99, 1, 1));

        let clamped = BoundingBox::new(90, 10, 50, 5).clamp(100, 100)?;
        assert_eq!(clamped, BoundingBox::new(90, 10, 10, 5));
        Ok(())
    }

    #[test]
    fn clamp_rejects_zero_image_dimensions() {
        let err = BoundingBox::new(0, 0, 1, 1).clamp(0, 100).unwrap_err();
        assert!(matches!(err, EaselError::InvalidArgument(_)));
    }

    #[test]
    fn expand_then_clamp_never_escapes_the_image() -> anyhow::Result<()> {
        let boxes = [
            BoundingBox::new(0, 0, 1, 1),
            BoundingBox::new(50, 50, 10, 10),
            BoundingBox::new(99, 99, 1, 1),
            BoundingBox::new(250, 3, 40, 900),
        ];
        let margins = [0i64, 1, 7, 50, 1000, i64::from(u32::MAX), i64::MAX];
        for bbox in &boxes {
            for &margin in &margins {
                let result = bbox.expand(margin)?.clamp(100, 100)?;
                assert!(result.x <= 99 && result.y <= 99, "{result:?}");
                assert!(result.right() <= 100 && result.bottom() <= 100, "{result:?}");
                assert!(result.w >= 1 && result.h >= 1, "{result:?}");
            }
        }
        Ok(())
    }
}
