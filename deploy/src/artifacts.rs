use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use ethers::{abi::Abi, types::Bytes};
use serde::Deserialize;

/// ABI and creation bytecode of one compiled contract.
#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    #[serde(rename = "contractName", default)]
    pub contract_name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
    /// Runtime code, compared against on-chain code to detect changes.
    #[serde(rename = "deployedBytecode", default)]
    pub deployed_bytecode: Bytes,
}

/// Compiler output directory, searched recursively for `<Name>.json`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn load(&self, name: &str) -> Result<Artifact> {
        let file_name = format!("{name}.json");
        let path = find_file(&self.root, &file_name)?
            .ok_or_else(|| anyhow!("artifact {name} not found under {}", self.root.display()))?;

        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading artifact {}", path.display()))?;
        let artifact: Artifact = serde_json::from_str(&content)
            .with_context(|| format!("parsing artifact {}", path.display()))?;

        if artifact.bytecode.is_empty() {
            bail!("artifact {name} has no bytecode (abstract contract or interface?)");
        }
        log::debug!("loaded artifact {name} from {}", path.display());
        Ok(artifact)
    }
}

fn find_file(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    let candidate = dir.join(file_name);
    if candidate.is_file() {
        return Ok(Some(candidate));
    }

    let entries =
        fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            if let Some(found) = find_file(&path, file_name)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}
