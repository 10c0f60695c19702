use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

use easel_contracts::error::EaselError;
use easel_contracts::geometry::BoundingBox;

const EDITABLE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PROTECTED: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Rasterizes an edit mask for one region: a PNG with the asset's exact
/// dimensions, opaque inside the region, fully transparent elsewhere.
///
/// The mask is written as `<stem>.png` under `dir`; a name collision picks
/// the next free `<stem>-N.png` instead of overwriting. Returns the written
/// path, which doubles as the mask's identifier.
pub fn write_mask(
    region: &BoundingBox,
    width: u32,
    height: u32,
    dir: &Path,
    stem: &str,
) -> Result<PathBuf, EaselError> {
    if width == 0 || height == 0 {
        return Err(EaselError::InvalidArgument(format!(
            "mask dimensions must be positive, got {width}x{height}"
        )));
    }

    let mut mask = RgbaImage::from_pixel(width, height, PROTECTED);
    let x_end = region.right().min(width);
    let y_end = region.bottom().min(height);
    for y in region.y.min(height)..y_end {
        for x in region.x.min(width)..x_end {
            mask.put_pixel(x, y, EDITABLE);
        }
    }

    std::fs::create_dir_all(dir).map_err(|cause| EaselError::IoFailure {
        path: dir.to_path_buf(),
        cause: cause.into(),
    })?;
    let path = next_free_path(dir, stem);
    mask.save(&path).map_err(|cause| EaselError::IoFailure {
        path: path.clone(),
        cause: cause.into(),
    })?;
    Ok(path)
}

fn next_free_path(dir: &Path, stem: &str) -> PathBuf {
    let candidate = dir.join(format!("{stem}.png"));
    if !candidate.exists() {
        return candidate;
    }
    let mut suffix = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}-{suffix}.png"));
        if !candidate.exists() {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_matches_asset_dimensions_and_region() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let region = BoundingBox::new(2, 3, 4, 5);
        let path = write_mask(&region, 16, 12, temp.path(), "mask-iter-01")?;
        assert_eq!(path, temp.path().join("mask-iter-01.png"));

        let mask = image::open(&path)?.to_rgba8();
        assert_eq!(mask.dimensions(), (16, 12));
        assert_eq!(*mask.get_pixel(2, 3), Rgba([255, 255, 255, 255]));
        assert_eq!(*mask.get_pixel(5, 7), Rgba([255, 255, 255, 255]));
        assert_eq!(*mask.get_pixel(1, 3), Rgba([0, 0, 0, 0]));
        assert_eq!(*mask.get_pixel(6, 3), Rgba([0, 0, 0, 0]));
        assert_eq!(*mask.get_pixel(2, 8), Rgba([0, 0, 0, 0]));
        assert_eq!(*mask.get_pixel(15, 11), Rgba([0, 0, 0, 0]));
        Ok(())
    }

    #[test]
    fn collisions_pick_the_next_free_suffix() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let region = BoundingBox::new(0, 0, 2, 2);
        let first = write_mask(&region, 4, 4, temp.path(), "mask")?;
        let second = write_mask(&region, 4, 4, temp.path(), "mask")?;
        let third = write_mask(&region, 4, 4, temp.path(), "mask")?;

        assert_eq!(first, temp.path().join("mask.png"));
        assert_eq!(second, temp.path().join("mask-1.png"));
        assert_eq!(third, temp.path().join("mask-2.png"));
        assert!(first.exists() && second.exists() && third.exists());
        Ok(())
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let err = write_mask(&BoundingBox::new(0, 0, 1, 1), 0, 10, temp.path(), "mask")
            .unwrap_err();
        assert!(matches!(err, EaselError::InvalidArgument(_)));
    }

    #[test]
    fn unwritable_target_surfaces_io_failure() {
        let temp = tempfile::tempdir().unwrap();
        let file_as_dir = temp.path().join("not-a-dir");
        std::fs::write(&file_as_dir, b"occupied").unwrap();
        let err = write_mask(
            &BoundingBox::new(0, 0, 1, 1),
            4,
            4,
            &file_as_dir,
            "mask",
        )
        .unwrap_err();
        assert!(matches!(err, EaselError::IoFailure { .. }));
    }
}
