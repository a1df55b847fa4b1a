use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use ethers::{
    abi::Token,
    contract::ContractFactory,
    providers::Middleware,
    types::{H160, U256},
};

use crate::{
    artifacts::{Artifact, ArtifactStore},
    config::{canonical_network, Client},
    contracts::{ProxyAdmin, FACTORY, INITIALIZER, PROXY_ADMIN, TRANSPARENT_PROXY},
    registry::{store_address_list, store_imp_list, Registry},
    utils::{checksum, print_banner},
};

/// What to deploy behind a transparent upgradeable proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    pub contract: String,
    pub proxy_admin: String,
    pub initializer: String,
    pub init_args: Vec<Token>,
    /// Proxy already recorded for the network; set means upgrade instead of create.
    pub existing_proxy: Option<H160>,
    pub existing_admin: Option<H160>,
    pub existing_implementation: Option<H160>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyDeployment {
    pub address: H160,
    pub implementation: H160,
    pub admin: H160,
}

/// Chain operations the deployment runner is built from.
pub trait DeployBackend {
    fn deployer(&self) -> H160;

    async fn balance(&self, account: H160) -> Result<U256>;

    async fn admin_owner(&self, admin: H160) -> Result<H160>;

    /// Whether the code at `deployed` is the compiled runtime code of `contract`.
    async fn code_matches(&self, contract: &str, deployed: H160) -> Result<bool>;

    async fn deploy_implementation(&self, contract: &str) -> Result<H160>;

    async fn deploy_admin(&self, proxy_admin: &str) -> Result<H160>;

    async fn deploy_proxy(
        &self,
        request: &ProxyRequest,
        implementation: H160,
        admin: H160,
    ) -> Result<H160>;

    async fn upgrade(&self, admin: H160, proxy: H160, implementation: H160) -> Result<()>;
}

/// Deploys through an RPC node using compiled artifacts.
pub struct EthersBackend {
    client: Arc<Client>,
    artifacts: ArtifactStore,
}

impl EthersBackend {
    pub fn new(client: Arc<Client>, artifacts: ArtifactStore) -> Self {
        Self { client, artifacts }
    }

    async fn deploy_artifact(&self, artifact: Artifact, args: Vec<Token>) -> Result<H160> {
        let contract = ContractFactory::new(artifact.abi, artifact.bytecode, self.client.clone())
            .deploy(args)?
            .legacy()
            .send()
            .await?;

        log::info!(
            "{} deployed at {}",
            artifact.contract_name,
            checksum(contract.address())
        );
        Ok(contract.address())
    }
}

impl DeployBackend for EthersBackend {
    fn deployer(&self) -> H160 {
        self.client.address()
    }

    async fn balance(&self, account: H160) -> Result<U256> {
        Ok(self.client.get_balance(account, None).await?)
    }

    async fn admin_owner(&self, admin: H160) -> Result<H160> {
        Ok(ProxyAdmin::new(admin, self.client.clone())
            .owner()
            .call()
            .await?)
    }

    async fn code_matches(&self, contract: &str, deployed: H160) -> Result<bool> {
        let artifact = self.artifacts.load(contract)?;
        if artifact.deployed_bytecode.is_empty() {
            log::warn!("artifact {contract} has no deployedBytecode, assuming changed");
            return Ok(false);
        }
        let code = self.client.get_code(deployed, None).await?;
        Ok(code == artifact.deployed_bytecode)
    }

    async fn deploy_implementation(&self, contract: &str) -> Result<H160> {
        let artifact = self.artifacts.load(contract)?;
        self.deploy_artifact(artifact, vec![]).await
    }

    async fn deploy_admin(&self, proxy_admin: &str) -> Result<H160> {
        let artifact = self.artifacts.load(proxy_admin)?;
        self.deploy_artifact(artifact, vec![]).await
    }

    async fn deploy_proxy(
        &self,
        request: &ProxyRequest,
        implementation: H160,
        admin: H160,
    ) -> Result<H160> {
        let init_data = self
            .artifacts
            .load(&request.contract)?
            .abi
            .function(&request.initializer)?
            .encode_input(&request.init_args)?;

        let artifact = self.artifacts.load(TRANSPARENT_PROXY)?;
        self.deploy_artifact(
            artifact,
            vec![
                Token::Address(implementation),
                Token::Address(admin),
                Token::Bytes(init_data),
            ],
        )
        .await
    }

    async fn upgrade(&self, admin: H160, proxy: H160, implementation: H160) -> Result<()> {
        let proxy_admin = ProxyAdmin::new(admin, self.client.clone());
        proxy_admin
            .upgrade(proxy, implementation)
            .legacy()
            .send()
            .await?
            .await?
            .ok_or(anyhow!("upgrade transaction dropped"))?;

        let current = proxy_admin.get_proxy_implementation(proxy).call().await?;
        if current != implementation {
            bail!(
                "proxy {} still points at {} after upgrade",
                checksum(proxy),
                checksum(current)
            );
        }
        Ok(())
    }
}

pub struct Deploy<B> {
    backend: B,
    network: String,
}

impl<B: DeployBackend> Deploy<B> {
    pub fn new(backend: B, network: &str) -> Self {
        Self {
            backend,
            network: canonical_network(network).to_string(),
        }
    }

    fn proxy_request(
        &self,
        addresses: &Registry,
        implementations: &Registry,
    ) -> Result<ProxyRequest> {
        let existing_proxy = addresses.find(&self.network, FACTORY)?;
        let existing_admin = addresses.find(&self.network, PROXY_ADMIN)?;
        if existing_proxy.is_some() && existing_admin.is_none() {
            bail!(
                "{FACTORY} proxy is recorded for {} without its {PROXY_ADMIN}",
                self.network
            );
        }

        Ok(ProxyRequest {
            contract: FACTORY.to_string(),
            proxy_admin: PROXY_ADMIN.to_string(),
            initializer: INITIALIZER.to_string(),
            init_args: vec![],
            existing_proxy,
            existing_admin,
            existing_implementation: implementations.find(&self.network, FACTORY)?,
        })
    }

    /// Upgrades a recorded proxy, or creates implementation, admin and proxy.
    ///
    /// Admin ownership is verified before anything is sent, and a recorded
    /// implementation whose on-chain code matches the artifact is kept as is.
    async fn deploy_or_upgrade(&self, request: &ProxyRequest) -> Result<ProxyDeployment> {
        if let (Some(proxy), Some(admin)) = (request.existing_proxy, request.existing_admin) {
            let owner = self.backend.admin_owner(admin).await?;
            if owner != self.backend.deployer() {
                bail!(
                    "{} {} is owned by {}, not the deployer",
                    request.proxy_admin,
                    checksum(admin),
                    checksum(owner)
                );
            }

            if let Some(current) = request.existing_implementation {
                if self.backend.code_matches(&request.contract, current).await? {
                    log::info!(
                        "{} implementation {} is unchanged, reusing",
                        request.contract,
                        checksum(current)
                    );
                    return Ok(ProxyDeployment {
                        address: proxy,
                        implementation: current,
                        admin,
                    });
                }
            }

            let implementation = self.backend.deploy_implementation(&request.contract).await?;
            log::info!(
                "upgrading {} proxy {} to {}",
                request.contract,
                checksum(proxy),
                checksum(implementation)
            );
            self.backend.upgrade(admin, proxy, implementation).await?;
            return Ok(ProxyDeployment {
                address: proxy,
                implementation,
                admin,
            });
        }

        let implementation = self.backend.deploy_implementation(&request.contract).await?;
        let admin = match request.existing_admin {
            Some(admin) => {
                log::info!("reusing {} at {}", request.proxy_admin, checksum(admin));
                admin
            }
            None => self.backend.deploy_admin(&request.proxy_admin).await?,
        };
        let address = self
            .backend
            .deploy_proxy(request, implementation, admin)
            .await?;

        Ok(ProxyDeployment {
            address,
            implementation,
            admin,
        })
    }

    /// Deploys the factory behind its proxy and records the result in both lists.
    pub async fn run(
        &self,
        addresses: &mut Registry,
        implementations: &mut Registry,
    ) -> Result<ProxyDeployment> {
        let deployer = self.backend.deployer();
        print_banner(&self.network, deployer);

        let balance = self.backend.balance(deployer).await?;
        println!("Deployer balance: {balance}");

        let request = self.proxy_request(addresses, implementations)?;
        let deployment = self.deploy_or_upgrade(&request).await?;

        println!("\ndeployed to address: {}", checksum(deployment.address));

        let mut changed = false;
        for (contract, address) in [(FACTORY, deployment.address), (PROXY_ADMIN, deployment.admin)] {
            let address = checksum(address);
            changed |= addresses.insert(&self.network, contract, address.clone()) != Some(address);
        }
        let implementation = checksum(deployment.implementation);
        changed |= implementations.insert(&self.network, FACTORY, implementation.clone())
            != Some(implementation);

        if !changed {
            log::info!("registries for {} unchanged, nothing stored", self.network);
            return Ok(deployment);
        }
        store_address_list(addresses)?;
        store_imp_list(implementations)?;
        Ok(deployment)
    }
}
