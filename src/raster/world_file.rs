//! ESRI world file georeferencing.

use crate::constants::WORLD_FILE_EXTENSIONS;
use crate::error::{Error, Result};
use crate::geo::Affine;
use std::path::{Path, PathBuf};

/// Find the world file next to a raster, if any.
///
/// Tries `name.tfw`, `name.pgw`, `name.jgw`, `name.wld`, then the generic
/// `<ext>w` form (`name.tifw`), in both lower and upper case.
pub fn find_world_file(raster_path: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<String> = WORLD_FILE_EXTENSIONS.iter().map(ToString::to_string).collect();
    if let Some(ext) = raster_path.extension().and_then(|e| e.to_str()) {
        candidates.push(format!("{ext}w"));
    }

    candidates
        .iter()
        .flat_map(|ext| [ext.to_lowercase(), ext.to_uppercase()])
        .map(|ext| raster_path.with_extension(ext))
        .find(|p| p.is_file())
}

/// Parse world file contents into a corner-based transform.
///
/// The six lines are `A, D, B, E, C, F` where `(C, F)` is the centre of
/// the top-left pixel; the returned transform is shifted half a pixel to
/// the outer corner.
pub fn parse_world_file(contents: &str, path: &Path) -> Result<Affine> {
    let values: Vec<f64> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            l.parse::<f64>().map_err(|_| Error::WorldFileParse {
                path: path.to_path_buf(),
                message: format!("'{l}' is not a number"),
            })
        })
        .collect::<Result<_>>()?;

    let [a, d, b, e, c, f] = values.as_slice() else {
        return Err(Error::WorldFileParse {
            path: path.to_path_buf(),
            message: format!("expected 6 values, found {}", values.len()),
        });
    };

    Ok(Affine {
        a: *a,
        b: *b,
        c: c - a / 2.0 - b / 2.0,
        d: *d,
        e: *e,
        f: f - d / 2.0 - e / 2.0,
    })
}

/// Read the transform for a raster from its world file.
pub fn read_world_file(raster_path: &Path) -> Result<Affine> {
    let world_path = find_world_file(raster_path).ok_or_else(|| Error::MissingGeoreference {
        path: raster_path.to_path_buf(),
    })?;
    let contents = std::fs::read_to_string(&world_path)?;
    parse_world_file(&contents, &world_path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WORLD: &str = "0.5\n0.0\n0.0\n-0.5\n1000.25\n2999.75\n";

    #[test]
    fn test_parse_shifts_to_pixel_corner() {
        let t = parse_world_file(WORLD, Path::new("x.tfw")).unwrap();
        assert_eq!(t, Affine::north_up(1000.0, 3000.0, 0.5, 0.5));
    }

    #[test]
    fn test_parse_rejects_short_file() {
        let result = parse_world_file("1\n0\n0\n-1\n", Path::new("x.tfw"));
        assert!(matches!(result, Err(Error::WorldFileParse { .. })));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = parse_world_file("1\n0\nzero\n-1\n5\n6\n", Path::new("x.tfw"));
        assert!(matches!(result, Err(Error::WorldFileParse { .. })));
    }

    #[test]
    fn test_find_world_file_variants() {
        let dir = TempDir::new().unwrap();
        let raster = dir.path().join("ortho.tif");
        assert!(find_world_file(&raster).is_none());

        let generic = dir.path().join("ortho.tifw");
        std::fs::write(&generic, WORLD).unwrap();
        assert_eq!(find_world_file(&raster), Some(generic));

        let tfw = dir.path().join("ortho.tfw");
        std::fs::write(&tfw, WORLD).unwrap();
        assert_eq!(find_world_file(&raster), Some(tfw));
    }

    #[test]
    fn test_read_world_file_missing_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = read_world_file(&dir.path().join("none.png"));
        assert!(matches!(result, Err(Error::MissingGeoreference { .. })));
    }
}
