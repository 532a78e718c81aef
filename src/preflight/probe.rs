use std::io;
use std::path::Path;

/// Checks that files can be created in `dir` by creating and dropping a
/// temporary file there.
pub fn probe_writable(dir: &Path) -> io::Result<()> {
    let probe = tempfile::Builder::new()
        .prefix(".crate-sync-probe")
        .tempfile_in(dir)?;
    probe.close()
}
