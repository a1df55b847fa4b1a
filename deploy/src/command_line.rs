use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ethers::types::{H160, U256};

use crate::{
    artifacts::ArtifactStore,
    config::{canonical_network, NetworkConfig, DEPLOYER_INDEX},
    create::create,
    deploy::{Deploy, EthersBackend},
    registry::{read_address_list, read_imp_list},
    signature::{sign, DEFAULT_VALID_FOR},
};

#[derive(Debug, Parser)]
#[clap(about = "Deploy and operate the DeSurvey NFT factory")]
pub struct CommandLine {
    /// Target network; `hardhat` is an alias of `localhost`
    #[clap(short, long, env = "NETWORK", default_value = "localhost")]
    network: String,

    /// Directory holding the address and implementation lists
    #[clap(long, env = "REGISTRY_DIR", default_value = "info")]
    registry_dir: PathBuf,

    /// Compiler output directory with contract artifacts
    #[clap(long, env = "ARTIFACTS_DIR", default_value = "artifacts")]
    artifacts: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Deploy (or upgrade) the factory behind a transparent proxy
    Deploy,
    /// Sign an off-chain mint request
    Sign(SignArgs),
    /// Create new nft
    Create(CreateArgs),
    /// Print the recorded addresses of the network
    Show,
}

#[derive(Debug, Args)]
struct SignArgs {
    /// Address allowed to mint
    #[clap(short, long)]
    user: H160,

    #[clap(short, long, alias = "level", default_value_t = 1)]
    achievement_id: u64,

    /// Seconds the signature stays valid past the latest block
    #[clap(long, default_value_t = DEFAULT_VALID_FOR)]
    valid_for: u64,
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// Mint price in the native token, e.g. 1.5
    #[clap(long)]
    price: String,

    /// Maximum number of NFTs in the collection
    #[clap(long)]
    limit: String,
}

impl CommandLine {
    pub async fn execute(self) -> Result<()> {
        let network = canonical_network(&self.network);
        let mut addresses = read_address_list(&self.registry_dir)?;

        match self.command {
            Command::Deploy => {
                let mut implementations = read_imp_list(&self.registry_dir)?;
                let client = NetworkConfig::load(network)?.client(DEPLOYER_INDEX).await?;
                let backend = EthersBackend::new(client, ArtifactStore::new(self.artifacts));

                Deploy::new(backend, network)
                    .run(&mut addresses, &mut implementations)
                    .await?;
            }
            Command::Sign(args) => {
                let client = NetworkConfig::load(network)?.client(DEPLOYER_INDEX).await?;
                sign(
                    client,
                    &addresses,
                    network,
                    args.user,
                    U256::from(args.achievement_id),
                    args.valid_for,
                )
                .await?;
            }
            Command::Create(args) => {
                let client = NetworkConfig::load(network)?.client(DEPLOYER_INDEX).await?;
                create(client, &addresses, network, &args.price, &args.limit).await?;
            }
            Command::Show => {
                let implementations = read_imp_list(&self.registry_dir)?;
                println!("addresses ({}):", addresses.path().display());
                for (contract, address) in addresses.contracts(network)? {
                    println!("  {contract}: {address}");
                }
                println!("implementations ({}):", implementations.path().display());
                for (contract, address) in implementations.contracts(network)? {
                    println!("  {contract}: {address}");
                }
            }
        }
        Ok(())
    }
}
