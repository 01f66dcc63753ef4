//! Output name planning.
//!
//! Names are assigned in submission order before any worker starts, so the
//! first source to claim a path keeps it regardless of completion order.

use crate::options::OutputSpec;
use crate::types::WatermarkError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Planned destination for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedOutput {
    Claimed(PathBuf),
    /// Path already claimed by an earlier source (or by the source itself)
    Collision { path: PathBuf, owner: usize },
}

impl PlannedOutput {
    pub fn path(&self) -> &Path {
        match self {
            PlannedOutput::Claimed(path) => path,
            PlannedOutput::Collision { path, .. } => path,
        }
    }

    pub fn to_result(&self) -> Result<PathBuf, WatermarkError> {
        match self {
            PlannedOutput::Claimed(path) => Ok(path.clone()),
            PlannedOutput::Collision { path, owner } => Err(WatermarkError::NameCollision {
                path: path.clone(),
                owner: *owner,
            }),
        }
    }
}

/// Destination path for a source
pub fn output_path(source: &Path, dest_dir: &Path, output: &OutputSpec) -> PathBuf {
    dest_dir.join(output.file_name_for(source))
}

/// Assign output paths in submission order.
///
/// A path claimed by an earlier index becomes a collision for every later
/// index. An output that would overwrite its own source is also rejected.
pub fn plan_outputs(sources: &[PathBuf], dest_dir: &Path, output: &OutputSpec) -> Vec<PlannedOutput> {
    let mut owners: HashMap<PathBuf, usize> = HashMap::new();

    sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let path = output_path(source, dest_dir, output);
            if paths_match(&path, source) {
                return PlannedOutput::Collision { path, owner: index };
            }
            match owners.get(&path) {
                Some(&owner) => PlannedOutput::Collision { path, owner },
                None => {
                    owners.insert(path.clone(), index);
                    PlannedOutput::Claimed(path)
                }
            }
        })
        .collect()
}

fn paths_match(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_duplicate_collides() {
        let sources = vec![
            PathBuf::from("/a/photo.jpg"),
            PathBuf::from("/b/photo.png"),
            PathBuf::from("/a/other.jpg"),
        ];
        let plan = plan_outputs(&sources, Path::new("/out"), &OutputSpec::default());
        assert_eq!(
            plan[0],
            PlannedOutput::Claimed(PathBuf::from("/out/photo_watermarked.jpg"))
        );
        assert_eq!(
            plan[1],
            PlannedOutput::Collision {
                path: PathBuf::from("/out/photo_watermarked.jpg"),
                owner: 0
            }
        );
        assert!(matches!(plan[2], PlannedOutput::Claimed(_)));
        assert!(matches!(
            plan[1].to_result(),
            Err(WatermarkError::NameCollision { owner: 0, .. })
        ));
    }

    #[test]
    fn test_output_over_source_collides() {
        let output = OutputSpec {
            suffix: String::new(),
            ..Default::default()
        };
        let sources = vec![PathBuf::from("/pics/a.jpg")];
        let plan = plan_outputs(&sources, Path::new("/pics"), &output);
        assert!(matches!(plan[0], PlannedOutput::Collision { owner: 0, .. }));
    }
}
