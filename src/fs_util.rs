use std::fs::File;
use std::path::Path;

use crate::error::WsError;

/// Check that `dest` does not exist yet and sits in a writable location.
/// Uses a create-then-close probe so a later open for writing is guaranteed
/// to succeed or fail identically. The probe file is left in place.
pub fn validate_file_for_writing(dest: &Path) -> Result<(), WsError> {
    if dest.exists() {
        return Err(WsError::Filesystem(format!(
            "file path already exists: {}",
            dest.display()
        )));
    }
    let probe = File::create(dest).map_err(|err| {
        WsError::Filesystem(format!(
            "file path is not writable: {}: {err}",
            dest.display()
        ))
    })?;
    drop(probe);
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn rejects_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.fa");
        std::fs::write(&path, b"x").unwrap();
        let err = validate_file_for_writing(&path).unwrap_err();
        assert_matches!(err, WsError::Filesystem(msg) => {
            assert!(msg.contains("already exists"));
        });
    }

    #[test]
    fn rejects_unwritable_location() {
        let err = validate_file_for_writing(Path::new("/no-such-dir/reads.fastq")).unwrap_err();
        assert_matches!(err, WsError::Filesystem(msg) => {
            assert!(msg.contains("not writable"));
        });
    }

    #[test]
    fn probe_leaves_an_openable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.fa");
        validate_file_for_writing(&path).unwrap();
        assert!(path.exists());
    }
}
