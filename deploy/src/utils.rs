use std::sync::Arc;

use anyhow::{anyhow, Result};
use ethers::{
    providers::{JsonRpcClient, Middleware},
    types::{BlockNumber, TransactionReceipt, H160, U256},
    utils::to_checksum,
};

use crate::config::Client;

pub async fn latest_block_timestamp<P: JsonRpcClient + 'static>(
    client: Arc<Client<P>>,
) -> Result<U256> {
    let block = client
        .get_block(BlockNumber::Latest)
        .await?
        .ok_or(anyhow!("latest block not found"))?;
    Ok(block.timestamp)
}

/// Registry representation of an address.
pub fn checksum(address: H160) -> String {
    to_checksum(&address, None)
}

pub fn print_banner(network: &str, deployer: H160) {
    println!("\n-----------------------------------------------------------");
    println!("-----  Network:  {network}");
    println!("-----  Deployer: {}", checksum(deployer));
    println!("-----------------------------------------------------------\n");
}

pub fn print_receipt(receipt: &TransactionReceipt) -> Result<()> {
    log::info!(
        "transaction hash:{:?} block:{:?} gas used:{:?}",
        receipt.transaction_hash,
        receipt.block_number,
        receipt.gas_used
    );
    println!("receipt: {}", serde_json::to_string_pretty(receipt)?);
    Ok(())
}
