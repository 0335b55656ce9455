//! YOLO label file writing.

use crate::annotation::LocalLabel;
use crate::constants::LABEL_DECIMAL_PLACES;
use crate::error::{Error, Result};
use std::fmt::Write as _;
use std::path::Path;

/// Format one label as `class cx cy w h`.
pub fn label_line(label: &LocalLabel) -> String {
    format!(
        "{} {:.p$} {:.p$} {:.p$} {:.p$}",
        label.class_id,
        label.cx,
        label.cy,
        label.w,
        label.h,
        p = LABEL_DECIMAL_PLACES
    )
}

/// Write a label file; an empty slice produces an empty file.
pub fn write_label_file(path: &Path, labels: &[LocalLabel]) -> Result<()> {
    let mut contents = String::new();
    for label in labels {
        let _ = writeln!(contents, "{}", label_line(label));
    }
    std::fs::write(path, contents).map_err(|e| Error::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_label_line_format() {
        let label = LocalLabel {
            class_id: 0,
            cx: 0.5,
            cy: 0.25,
            w: 0.125,
            h: 1.0 / 3.0,
        };
        assert_eq!(label_line(&label), "0 0.500000 0.250000 0.125000 0.333333");
    }

    #[test]
    fn test_empty_label_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patch_0_0.txt");
        write_label_file(&path, &[]).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().is_empty());
    }
}
