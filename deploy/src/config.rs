use std::sync::Arc;

use anyhow::Result;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer},
    utils::hex,
};
use thiserror::Error;

pub type Client<P = Http> = SignerMiddleware<Provider<P>, LocalWallet>;

/// Mnemonic used by local development nodes when none is configured.
pub const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Named account index of the deployer on every network.
pub const DEPLOYER_INDEX: usize = 0;

/// In-process network names and the stable name their state is stored under.
pub const NETWORK_ALIASES: &[(&str, &str)] = &[("hardhat", "localhost")];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown network {0}")]
    UnknownNetwork(String),

    #[error("environment variable {var} is required for network {network}")]
    MissingEnv { network: String, var: String },

    #[error("network {network} has {available} signer(s), account #{index} requested")]
    NoSigner {
        network: String,
        index: usize,
        available: usize,
    },
}

/// Maps a network alias to the name its registry entries live under.
pub fn canonical_network(name: &str) -> &str {
    NETWORK_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accounts {
    Mnemonic { phrase: String, count: u32 },
    PrivateKeys(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    pub url: String,
    pub accounts: Accounts,
}

impl NetworkConfig {
    /// Resolves `name` against the process environment.
    pub fn load(name: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(name, |var| std::env::var(var).ok())
    }

    pub fn from_lookup(
        name: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let name = canonical_network(name);
        let required = |var: &str| {
            lookup(var).ok_or_else(|| ConfigError::MissingEnv {
                network: name.to_string(),
                var: var.to_string(),
            })
        };

        let (url, accounts) = match name {
            "localhost" => (
                "http://127.0.0.1:8545".to_string(),
                Accounts::Mnemonic {
                    phrase: lookup("LOCALHOST_MNEMONIC").unwrap_or_else(|| DEV_MNEMONIC.to_string()),
                    count: 20,
                },
            ),
            "bnbtest" => (
                required("BNBTest_URL")?,
                match lookup("BNBTest_MNEMONIC") {
                    Some(phrase) => Accounts::Mnemonic { phrase, count: 10 },
                    None => Accounts::PrivateKeys(vec![]),
                },
            ),
            "bnb" => (
                required("BNB_URL")?,
                Accounts::PrivateKeys(lookup("BNB_PRIVATE_KEY").into_iter().collect()),
            ),
            other => return Err(ConfigError::UnknownNetwork(other.to_string())),
        };

        Ok(Self {
            name: name.to_string(),
            url,
            accounts,
        })
    }

    pub fn signers(&self) -> Result<Vec<LocalWallet>> {
        (0..self.signer_count())
            .map(|index| self.derive(index))
            .collect()
    }

    pub fn signer(&self, index: usize) -> Result<LocalWallet> {
        let available = self.signer_count();
        if index >= available {
            return Err(ConfigError::NoSigner {
                network: self.name.clone(),
                index,
                available,
            }
            .into());
        }
        self.derive(index)
    }

    fn signer_count(&self) -> usize {
        match &self.accounts {
            Accounts::Mnemonic { count, .. } => *count as usize,
            Accounts::PrivateKeys(keys) => keys.len(),
        }
    }

    fn derive(&self, index: usize) -> Result<LocalWallet> {
        match &self.accounts {
            Accounts::Mnemonic { phrase, .. } => Ok(MnemonicBuilder::<English>::default()
                .phrase(phrase.as_str())
                .index(u32::try_from(index)?)?
                .build()?),
            Accounts::PrivateKeys(keys) => {
                let sk = &keys[index];
                Ok(LocalWallet::from_bytes(&hex::decode(
                    sk.strip_prefix("0x").unwrap_or(sk),
                )?)?)
            }
        }
    }

    /// Connects to the network RPC with signer `index` bound to its chain id.
    pub async fn client(&self, index: usize) -> Result<Arc<Client>> {
        let wallet = self.signer(index)?;
        let provider = Provider::<Http>::try_from(self.url.as_str())?;
        let chain_id = provider.get_chainid().await?.as_u64();
        log::debug!("connected to {} (chain id {chain_id})", self.url);

        Ok(Arc::new(SignerMiddleware::new(
            provider,
            wallet.with_chain_id(chain_id),
        )))
    }
}
