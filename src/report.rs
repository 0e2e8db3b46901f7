//! Report output: the reconciled table as a symbol-sorted JSON object.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::types::{MethodRecord, MethodTable};
use crate::XrefError;

/// Canonical symbol → record, serialized in symbol order so two runs over
/// the same inputs diff cleanly.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct Report {
    pub methods: BTreeMap<String, MethodRecord>,
}

impl Report {
    pub fn from_table(methods: MethodTable) -> Self {
        Self { methods: methods.into_iter().collect() }
    }

    pub fn to_json(&self) -> Result<String, XrefError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report. The JSON is rendered up front and written to a
    /// sibling temp file that is renamed into place, so a failed run never
    /// leaves a partial report behind.
    pub fn save(&self, path: &Path) -> Result<(), XrefError> {
        let start = Instant::now();
        let json = self.to_json()?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        replace_via_temp(&tmp, path, |file| file.write_all(json.as_bytes()))?;

        eprintln!("[report] Saved {} methods ({:.1} KB) in {:.2}s to {}",
            self.methods.len(),
            json.len() as f64 / 1024.0,
            start.elapsed().as_secs_f64(),
            path.display());
        Ok(())
    }
}

/// Create `tmp`, fill it, flush it and rename it over `path`. On any failure
/// the temp file is removed and `path` is left untouched.
fn replace_via_temp(tmp: &Path, path: &Path, fill: impl FnOnce(&mut File) -> io::Result<()>) -> io::Result<()> {
    let result = File::create(tmp)
        .and_then(|mut file| {
            fill(&mut file)?;
            file.flush()
        })
        .and_then(|()| std::fs::rename(tmp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(tmp);
    }
    result
}
