// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{anyhow, Result};
use std::path::Path;

/// Read a yaml file and substitute `$VAR` / `${VAR}` references from the environment.
/// A missing file surfaces as an `io::Error` with kind `NotFound` so callers can branch on it.
pub fn load_yaml_with_env(file_path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(file_path)?;
    let expanded = shellexpand::env(&content)
        .map_err(|e| anyhow!("Could not expand {}: {}", e.var_name, e.cause))?;
    Ok(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_env_substitution() {
        Jail::expect_with(|jail| {
            jail.set_env("SEALED_TEST_RPC", "http://localhost:8545");
            jail.create_file("sealed.config.yaml", "rpc_url: \"${SEALED_TEST_RPC}\"")?;
            let out = load_yaml_with_env(&jail.directory().join("sealed.config.yaml"))
                .map_err(|e| e.to_string())?;
            assert_eq!(out, "rpc_url: \"http://localhost:8545\"");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_yaml_with_env(Path::new("/definitely/not/here.yaml")).unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
