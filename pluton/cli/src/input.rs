use std::path::Path;

use k8s_openapi::api::core::v1::Pod;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Path standing for stdin.
pub(crate) const STDIN: &str = "-";

pub(crate) fn read_input(path: &Path) -> CliResult<String> {
    let contents = if path == Path::new(STDIN) {
        std::io::read_to_string(std::io::stdin())
    } else {
        std::fs::read_to_string(path)
    };

    contents.map_err(|source| CliError::ReadInput {
        path: path.to_owned(),
        source,
    })
}

/// Reads a pod manifest. JSON is valid YAML, so both are accepted.
pub(crate) fn read_pod(path: &Path) -> CliResult<Pod> {
    let pod: Pod = serde_yaml::from_str(&read_input(path)?).map_err(|source| {
        CliError::ParsePod {
            path: path.to_owned(),
            source,
        }
    })?;

    debug!(pod = ?pod.metadata.name, "read pod manifest");

    Ok(pod)
}
