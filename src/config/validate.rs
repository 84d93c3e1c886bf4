// src/config/validate.rs

use crate::config::model::{BuildFile, RawBuildFile};
use crate::config::strings::Substituter;
use crate::errors::{BuildError, Result};
use crate::types::CheckMode;

impl TryFrom<RawBuildFile> for BuildFile {
    type Error = BuildError;

    fn try_from(raw: RawBuildFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_jobs(&raw)?;
        let check = validate_check_mode(&raw)?;

        let substituter = Substituter::new(raw.strings)?;
        let jobs = raw
            .job
            .iter()
            .map(|spec| substituter.substitute_spec(spec))
            .collect::<Result<Vec<_>>>()?;

        Ok(BuildFile::new_unchecked(check, raw.config.strict, jobs))
    }
}

fn ensure_has_jobs(raw: &RawBuildFile) -> Result<()> {
    if raw.job.is_empty() {
        return Err(BuildError::InvalidConfiguration(
            "build file must contain at least one [[job]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_check_mode(raw: &RawBuildFile) -> Result<Option<CheckMode>> {
    raw.config
        .check
        .as_deref()
        .map(str::parse::<CheckMode>)
        .transpose()
}
