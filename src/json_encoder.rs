//! JSON output for roster mappings.
//!
//! Output is a single object keyed by room id, in first-insertion order, indented with four
//! spaces and without a trailing newline. Existing consumers of `results.json` depend on
//! that exact layout.
//!
//! Example output:
//! ```json
//! {
//!     "101": [
//!         {
//!             "name": "Alice",
//!             "id": 23
//!         }
//!     ]
//! }
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::roster::RosterMap;
use crate::{Error, Result};

const INDENT: &[u8] = b"    ";

/// Serialize `rosters` into `w` and flush.
pub fn write_rosters<W: Write>(mut w: W, rosters: &RosterMap) -> Result<()> {
    let formatter = PrettyFormatter::with_indent(INDENT);
    let mut ser = Serializer::with_formatter(&mut w, formatter);
    rosters.serialize(&mut ser)?;
    w.flush()?;
    Ok(())
}

/// Serialize `rosters` into a string.
pub fn to_string(rosters: &RosterMap) -> Result<String> {
    let mut buf = Vec::new();
    write_rosters(&mut buf, rosters)?;
    String::from_utf8(buf).map_err(|err| Error::Other(Box::new(err)))
}

/// Persist `rosters` at `dest_path`.
///
/// We write to `dest_path.part`, fsync, then rename into place so readers never observe a
/// half-written file. The temporary file is removed if anything fails.
pub fn write_rosters_to_path(rosters: &RosterMap, dest_path: &Path) -> Result<()> {
    let tmp_path = PathBuf::from(format!("{}.part", dest_path.display()));

    let result = (|| -> Result<()> {
        let mut file = fs::File::create(&tmp_path).map_err(|err| Error::io(&tmp_path, err))?;
        write_rosters(&mut file, rosters)?;
        file.sync_all().map_err(|err| Error::io(&tmp_path, err))?;
        fs::rename(&tmp_path, dest_path).map_err(|err| Error::io(dest_path, err))?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    result
}
