//! Off-chain mint authorizations.
//!
//! The factory verifies an EIP-712 `MintRequest` signed by its configured
//! signer before minting. The typed schema declares `achievementId`; the
//! message is built with that same field name so the struct hash covers it.

use std::sync::Arc;

use anyhow::Result;
use ethers::{
    providers::{JsonRpcClient, Middleware},
    signers::{LocalWallet, Signer},
    types::{transaction::eip712::TypedData, Signature, H160, U256},
    utils::hex,
};
use serde_json::json;

use crate::{
    config::Client,
    contracts::FACTORY,
    registry::Registry,
    utils::{checksum, latest_block_timestamp},
};

pub const DOMAIN_NAME: &str = "DeSurveyNFTFactory";
pub const DOMAIN_VERSION: &str = "1.0";
pub const PRIMARY_TYPE: &str = "MintRequest";

/// Seconds added to the latest block timestamp to form `validUntil`.
pub const DEFAULT_VALID_FOR: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintDomain {
    pub chain_id: U256,
    pub verifying_contract: H160,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintRequest {
    pub user: H160,
    pub achievement_id: U256,
    pub valid_until: U256,
}

pub fn mint_request_typed_data(domain: &MintDomain, request: &MintRequest) -> Result<TypedData> {
    let payload = json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" },
            ],
            "MintRequest": [
                { "name": "user", "type": "address" },
                { "name": "achievementId", "type": "uint256" },
                { "name": "validUntil", "type": "uint256" },
            ],
        },
        "primaryType": PRIMARY_TYPE,
        "domain": {
            "name": DOMAIN_NAME,
            "version": DOMAIN_VERSION,
            "chainId": domain.chain_id.to_string(),
            "verifyingContract": checksum(domain.verifying_contract),
        },
        "message": {
            "user": checksum(request.user),
            "achievementId": request.achievement_id.to_string(),
            "validUntil": request.valid_until.to_string(),
        },
    });

    Ok(serde_json::from_value(payload)?)
}

pub async fn sign_mint_request(wallet: &LocalWallet, typed_data: &TypedData) -> Result<Signature> {
    Ok(wallet.sign_typed_data(typed_data).await?)
}

/// A signed mint request, ready for delivery to the minting transaction.
#[derive(Debug, Clone)]
pub struct MintAuthorization {
    pub typed_data: TypedData,
    pub signature: Signature,
}

impl MintAuthorization {
    pub fn signature_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signature.to_vec()))
    }
}

/// Signs a mint authorization for `user` against the factory recorded for `network`.
pub async fn sign<P: JsonRpcClient + 'static>(
    client: Arc<Client<P>>,
    addresses: &Registry,
    network: &str,
    user: H160,
    achievement_id: U256,
    valid_for: u64,
) -> Result<MintAuthorization> {
    let signer = client.signer();
    println!("signer is {}", checksum(signer.address()));

    let factory = addresses.address_of(network, FACTORY)?;

    let chain_id = client.get_chainid().await?;
    println!("chainId is {chain_id}");

    let valid_until = latest_block_timestamp(client.clone()).await? + U256::from(valid_for);

    let typed_data = mint_request_typed_data(
        &MintDomain {
            chain_id,
            verifying_contract: factory,
        },
        &MintRequest {
            user,
            achievement_id,
            valid_until,
        },
    )?;
    log::debug!("mint request valid until {valid_until}");

    let signature = sign_mint_request(signer, &typed_data).await?;
    let authorization = MintAuthorization {
        typed_data,
        signature,
    };
    println!("Signature is {}", authorization.signature_hex());
    Ok(authorization)
}
