//! Compiled contract artifacts and deployment records.
//!
//! Artifacts are read in either of the two common compiler output layouts:
//! - hardhat: `{"contractName": .., "abi": [..], "bytecode": "0x.."}`
//! - foundry: `{"abi": [..], "bytecode": {"object": "0x.."}}`
//!
//! Deployment records are written one file per contract, `<dir>/<Name>.json`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use aa_deploy::{Deployment, InitCode, Salt};
use alloy_primitives::{Address, Bytes, TxHash};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{decode_hex, DeployerError, Result};

/// A compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Contract name
    pub name: String,
    /// Contract ABI, kept as raw JSON
    pub abi: Value,
    /// Creation bytecode, never empty
    pub bytecode: Bytes,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    contract_name: Option<String>,
    #[serde(default)]
    abi: Value,
    bytecode: RawBytecode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

impl Artifact {
    /// Parses an artifact. `name` is used when the artifact carries no contract name.
    pub fn from_json(name: &str, json: &str) -> std::result::Result<Self, ArtifactError> {
        let raw: RawArtifact = serde_json::from_str(json).map_err(ArtifactError::Json)?;
        let bytecode = match raw.bytecode {
            RawBytecode::Hex(hex) | RawBytecode::Object { object: hex } => hex,
        };
        if bytecode.contains("__") {
            return Err(ArtifactError::Invalid("bytecode has unlinked libraries".to_string()));
        }
        let bytecode = decode_hex(&bytecode).map_err(|e| ArtifactError::Invalid(e.to_string()))?;
        if bytecode.is_empty() {
            return Err(ArtifactError::Invalid(
                "empty bytecode (abstract contract or interface?)".to_string(),
            ));
        }

        Ok(Self {
            name: raw.contract_name.unwrap_or_else(|| name.to_string()),
            abi: raw.abi,
            bytecode: bytecode.into(),
        })
    }

    /// Builds init code from the bytecode and ABI-encoded constructor arguments.
    pub fn init_code(&self, constructor_args: &[u8]) -> aa_deploy::Result<InitCode> {
        InitCode::with_args(&self.bytecode, constructor_args)
    }
}

/// Why an artifact file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Not valid artifact JSON
    #[error(transparent)]
    Json(serde_json::Error),
    /// Valid JSON with unusable content
    #[error("{0}")]
    Invalid(String),
}

/// Looks up artifacts by contract name under a build output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Finds `<Name>.json` anywhere under the root, e.g. `contracts/<Name>.sol/<Name>.json`.
    pub fn find(&self, name: &str) -> Result<PathBuf> {
        let file_name = format!("{name}.json");
        find_file(&self.dir, &file_name)?.ok_or_else(|| DeployerError::ArtifactNotFound {
            name: name.to_string(),
            dir: self.dir.clone(),
        })
    }

    /// Loads the artifact of contract `name`.
    pub fn load(&self, name: &str) -> Result<Artifact> {
        let path = self.find(name)?;
        debug!(name, path = %path.display(), "Loading artifact");
        let json = fs::read_to_string(&path).map_err(DeployerError::io(&path))?;
        Artifact::from_json(name, &json).map_err(|e| match e {
            ArtifactError::Json(source) => DeployerError::Json { path, source },
            ArtifactError::Invalid(reason) => {
                DeployerError::InvalidInput(format!("artifact {}: {reason}", path.display()))
            }
        })
    }
}

/// Depth-first search for `file_name`, skipping hidden directories and build-info.
fn find_file(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    let candidate = dir.join(file_name);
    if candidate.is_file() {
        return Ok(Some(candidate));
    }

    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(DeployerError::io(dir))? {
        let path = entry.map_err(DeployerError::io(dir))?.path();
        let skip = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.') || n == "build-info");
        if path.is_dir() && !skip {
            subdirs.push(path);
        }
    }
    // Stable search order across platforms
    subdirs.sort();

    for subdir in subdirs {
        if let Some(found) = find_file(&subdir, file_name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// A contract recorded after deployment, enough for downstream tooling to interact with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentFile {
    /// Contract address
    pub address: Address,
    /// Contract ABI
    pub abi: Value,
    /// CREATE2 salt
    pub salt: Salt,
    /// Whether the contract was already deployed before this run
    pub already_existed: bool,
    /// Deployment transaction, if this run sent one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
}

impl DeploymentFile {
    /// Creates the record of `deployment`.
    pub fn new(artifact: &Artifact, salt: Salt, deployment: Deployment) -> Self {
        Self {
            address: deployment.address,
            abi: artifact.abi.clone(),
            salt,
            already_existed: deployment.already_existed,
            transaction_hash: deployment.tx_hash,
        }
    }
}

/// Reads and writes [`DeploymentFile`]s in a directory.
#[derive(Debug, Clone)]
pub struct DeploymentsDir {
    dir: PathBuf,
}

impl DeploymentsDir {
    /// Uses `dir`, which is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Writes the record of contract `name`, replacing any previous one.
    pub fn write(&self, name: &str, record: &DeploymentFile) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(DeployerError::io(&self.dir))?;
        let path = self.path(name);
        let json = serde_json::to_string_pretty(record).map_err(DeployerError::json(&path))?;
        fs::write(&path, json + "\n").map_err(DeployerError::io(&path))?;
        debug!(name, path = %path.display(), "Deployment record written");
        Ok(path)
    }

    /// Reads the record of contract `name`.
    pub fn read(&self, name: &str) -> Result<DeploymentFile> {
        let path = self.path(name);
        let json = fs::read_to_string(&path).map_err(DeployerError::io(&path))?;
        serde_json::from_str(&json).map_err(DeployerError::json(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, bytes};
    use serde_json::json;

    fn write(dir: &Path, rel: &str, value: &Value) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, value.to_string()).unwrap();
    }

    #[test]
    fn test_hardhat_artifact() {
        let json = json!({
            "contractName": "EntryPoint",
            "abi": [{"type": "constructor", "inputs": []}],
            "bytecode": "0x6080604052",
        });
        let artifact = Artifact::from_json("Ignored", &json.to_string()).unwrap();
        assert_eq!(artifact.name, "EntryPoint");
        assert_eq!(artifact.bytecode, bytes!("6080604052"));
        assert_eq!(artifact.abi[0]["type"], "constructor");
    }

    #[test]
    fn test_foundry_artifact() {
        let json = json!({
            "abi": [],
            "bytecode": {"object": "0x60806040", "linkReferences": {}},
        });
        let artifact = Artifact::from_json("TestPaymasterAcceptAll", &json.to_string()).unwrap();
        assert_eq!(artifact.name, "TestPaymasterAcceptAll");
        assert_eq!(artifact.bytecode, bytes!("60806040"));
    }

    #[test]
    fn test_empty_bytecode_rejected() {
        let json = json!({"contractName": "IEntryPoint", "abi": [], "bytecode": "0x"});
        assert!(matches!(
            Artifact::from_json("IEntryPoint", &json.to_string()),
            Err(ArtifactError::Invalid(_))
        ));
    }

    #[test]
    fn test_unlinked_bytecode_rejected() {
        let json = json!({"abi": [], "bytecode": "0x6080__$abcdef$__6080"});
        assert!(matches!(
            Artifact::from_json("Linked", &json.to_string()),
            Err(ArtifactError::Invalid(_))
        ));
    }

    #[test]
    fn test_store_finds_nested_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = json!({"contractName": "EntryPoint", "abi": [], "bytecode": "0x6080"});
        write(dir.path(), "contracts/core/EntryPoint.sol/EntryPoint.json", &artifact);
        write(dir.path(), "build-info/EntryPoint.json", &json!({"bogus": true}));

        let store = ArtifactStore::new(dir.path());
        let loaded = store.load("EntryPoint").unwrap();
        assert_eq!(loaded.bytecode, bytes!("6080"));

        assert!(matches!(
            store.load("Missing"),
            Err(DeployerError::ArtifactNotFound { ref name, .. }) if name == "Missing"
        ));
    }

    #[test]
    fn test_store_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("EntryPoint.json"), "{ not json").unwrap();
        let err = ArtifactStore::new(dir.path()).load("EntryPoint").unwrap_err();
        assert!(matches!(err, DeployerError::Json { .. }));
    }

    #[test]
    fn test_deployment_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let deployments = DeploymentsDir::new(dir.path().join("deployments"));
        let artifact = Artifact {
            name: "EntryPoint".to_string(),
            abi: json!([{"type": "function", "name": "depositTo"}]),
            bytecode: bytes!("6080"),
        };
        let deployment = Deployment {
            address: address!("4337084d9e255ff0702461cf8895ce9e3b5ff108"),
            already_existed: true,
            tx_hash: None,
        };
        let record = DeploymentFile::new(&artifact, Salt::ZERO, deployment);

        let path = deployments.write("EntryPoint", &record).unwrap();
        let written: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["alreadyExisted"], true);
        assert!(written.get("transactionHash").is_none());

        assert_eq!(deployments.read("EntryPoint").unwrap(), record);
    }
}
