// src/config/validate.rs

use crate::config::model::{BuildOptions, RawBuildOptions, ToolCommand};
use crate::errors::{BuildError, Result};

impl TryFrom<RawBuildOptions> for BuildOptions {
    type Error = crate::errors::BuildError;

    fn try_from(raw: RawBuildOptions) -> std::result::Result<Self, Self::Error> {
        validate_raw_options(&raw)?;
        Ok(BuildOptions::new_unchecked(raw))
    }
}

fn validate_raw_options(raw: &RawBuildOptions) -> Result<()> {
    validate_livereload(raw)?;
    validate_tools(raw)?;
    Ok(())
}

fn validate_livereload(raw: &RawBuildOptions) -> Result<()> {
    if raw.livereload.port == 0 {
        return Err(BuildError::Config(
            "[livereload].port must be >= 1 (got 0)".to_string(),
        ));
    }
    if raw.livereload.host.trim().is_empty() {
        return Err(BuildError::Config(
            "[livereload].host must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_tools(raw: &RawBuildOptions) -> Result<()> {
    let tools: [(&str, &ToolCommand); 5] = [
        ("stylus", &raw.tools.stylus),
        ("bundler", &raw.tools.bundler),
        ("minifier", &raw.tools.minifier),
        ("installer", &raw.tools.installer),
        ("compiler", &raw.tools.compiler),
    ];

    for (name, tool) in tools {
        if tool.program.trim().is_empty() {
            return Err(BuildError::Config(format!(
                "[tools.{name}].program must not be empty"
            )));
        }
    }
    Ok(())
}
