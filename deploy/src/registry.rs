use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

use ethers::types::H160;
use thiserror::Error;

/// File holding the proxy (public) address of every deployed contract.
pub const ADDRESS_LIST_FILE: &str = "contract-addresses.json";

/// File holding the implementation address behind every proxy.
pub const IMPLEMENTATION_LIST_FILE: &str = "implementation-addresses.json";

pub type Contracts = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write registry {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed registry {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("network {0} not found in registry")]
    NetworkNotFound(String),

    #[error("contract {contract} not found in registry for network {network}")]
    ContractNotFound { network: String, contract: String },

    #[error("registry entry {network}.{contract} is not an address: {value}")]
    InvalidAddress {
        network: String,
        contract: String,
        value: String,
    },
}

/// Per-network mapping from contract name to address, backed by one JSON file.
///
/// Loading and saving are explicit: nothing is written until [`Registry::save`]
/// is called, and a save always replaces the whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    path: PathBuf,
    networks: BTreeMap<String, Contracts>,
}

impl Registry {
    /// Loads the registry at `path`. A missing file yields an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let networks = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| {
                RegistryError::Malformed {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("registry {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(RegistryError::Read { path, source }),
        };

        Ok(Self { path, networks })
    }

    /// Writes the full mapping back to its file, replacing prior contents.
    pub fn save(&self) -> Result<(), RegistryError> {
        let write_err = |source| RegistryError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut content =
            serde_json::to_string_pretty(&self.networks).map_err(|source| {
                RegistryError::Malformed {
                    path: self.path.clone(),
                    source,
                }
            })?;
        content.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;

        log::debug!("stored registry {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contracts(&self, network: &str) -> Result<&Contracts, RegistryError> {
        self.networks
            .get(network)
            .ok_or_else(|| RegistryError::NetworkNotFound(network.to_string()))
    }

    pub fn address(&self, network: &str, contract: &str) -> Result<&str, RegistryError> {
        self.contracts(network)?
            .get(contract)
            .map(String::as_str)
            .ok_or_else(|| RegistryError::ContractNotFound {
                network: network.to_string(),
                contract: contract.to_string(),
            })
    }

    pub fn address_of(&self, network: &str, contract: &str) -> Result<H160, RegistryError> {
        let value = self.address(network, contract)?;
        H160::from_str(value).map_err(|_| RegistryError::InvalidAddress {
            network: network.to_string(),
            contract: contract.to_string(),
            value: value.to_string(),
        })
    }

    /// Like [`Registry::address_of`], but absence is not an error.
    pub fn find(&self, network: &str, contract: &str) -> Result<Option<H160>, RegistryError> {
        match self.address_of(network, contract) {
            Ok(address) => Ok(Some(address)),
            Err(RegistryError::NetworkNotFound(_) | RegistryError::ContractNotFound { .. }) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Records `address` for `contract`, returning the value it replaced.
    pub fn insert(
        &mut self,
        network: &str,
        contract: &str,
        address: impl Into<String>,
    ) -> Option<String> {
        self.networks
            .entry(network.to_string())
            .or_default()
            .insert(contract.to_string(), address.into())
    }
}

pub fn read_address_list(dir: &Path) -> Result<Registry, RegistryError> {
    Registry::load(dir.join(ADDRESS_LIST_FILE))
}

pub fn read_imp_list(dir: &Path) -> Result<Registry, RegistryError> {
    Registry::load(dir.join(IMPLEMENTATION_LIST_FILE))
}

pub fn store_address_list(list: &Registry) -> Result<(), RegistryError> {
    list.save()
}

pub fn store_imp_list(list: &Registry) -> Result<(), RegistryError> {
    list.save()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACTORY: &str = "DeSurveyNFTFactory";

    const CANONICAL: &str = r#"{
  "bnbtest": {
    "DeSurveyNFTFactory": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
    "ProxyAdmin": "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
  },
  "localhost": {
    "DeSurveyNFTFactory": "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
  }
}
"#;

    fn write_canonical(dir: &Path) -> PathBuf {
        let path = dir.join(ADDRESS_LIST_FILE);
        fs::write(&path, CANONICAL).unwrap();
        path
    }

    #[test]
    fn load_then_save_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_canonical(dir.path());

        read_address_list(dir.path()).unwrap().save().unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), CANONICAL);
    }

    #[test]
    fn insert_persists_only_the_new_entry() {
        let dir = tempfile::tempdir().unwrap();
        write_canonical(dir.path());

        let before = read_address_list(dir.path()).unwrap();
        let mut list = before.clone();
        let replaced = list.insert("bnb", FACTORY, "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
        assert_eq!(replaced, None);
        store_address_list(&list).unwrap();

        let after = read_address_list(dir.path()).unwrap();
        assert_eq!(
            after.address("bnb", FACTORY).unwrap(),
            "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
        );
        for network in ["bnbtest", "localhost"] {
            assert_eq!(after.contracts(network).unwrap(), before.contracts(network).unwrap());
        }
    }

    #[test]
    fn insert_overwrites_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        write_canonical(dir.path());

        let mut list = read_address_list(dir.path()).unwrap();
        let replaced = list.insert("localhost", FACTORY, "0x0000000000000000000000000000000000000001");

        assert_eq!(
            replaced.as_deref(),
            Some("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0")
        );
        assert_eq!(
            list.address_of("localhost", FACTORY).unwrap(),
            H160::from_low_u64_be(1)
        );
    }

    #[test]
    fn missing_network_and_contract_fail_with_named_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_canonical(dir.path());
        let list = read_address_list(dir.path()).unwrap();

        assert!(matches!(
            list.address("bnb", FACTORY),
            Err(RegistryError::NetworkNotFound(n)) if n == "bnb"
        ));
        assert!(matches!(
            list.address("localhost", "ProxyAdmin"),
            Err(RegistryError::ContractNotFound { network, contract })
                if network == "localhost" && contract == "ProxyAdmin"
        ));
        assert_eq!(list.find("localhost", "ProxyAdmin").unwrap(), None);
    }

    #[test]
    fn invalid_address_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = read_imp_list(dir.path()).unwrap();
        list.insert("localhost", FACTORY, "not-an-address");

        assert!(matches!(
            list.address_of("localhost", FACTORY),
            Err(RegistryError::InvalidAddress { .. })
        ));
        assert!(list.find("localhost", FACTORY).is_err());
    }

    #[test]
    fn missing_file_loads_empty_and_save_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("info");

        let mut list = read_imp_list(&nested).unwrap();
        assert!(matches!(
            list.contracts("localhost"),
            Err(RegistryError::NetworkNotFound(_))
        ));

        list.insert("localhost", FACTORY, "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB");
        store_imp_list(&list).unwrap();

        assert!(nested.join(IMPLEMENTATION_LIST_FILE).exists());
        assert_eq!(read_imp_list(&nested).unwrap(), list);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(ADDRESS_LIST_FILE), "{ not json").unwrap();

        assert!(matches!(
            read_address_list(dir.path()),
            Err(RegistryError::Malformed { .. })
        ));
    }
}
