use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use ethers::{
    contract::ContractCall,
    providers::Middleware,
    types::{TransactionReceipt, U256},
    utils::{parse_units, ParseUnits},
};

use crate::{
    config::Client,
    contracts::{DeSurveyNFTFactory, FACTORY},
    registry::Registry,
    utils::{checksum, print_receipt},
};

/// Decimals of the chain's native unit that prices are quoted in.
pub const PRICE_DECIMALS: u32 = 18;

pub fn parse_price(price: &str) -> Result<U256> {
    let price = price.trim();
    if let Some((_, fraction)) = price.split_once('.') {
        if fraction.len() > PRICE_DECIMALS as usize {
            bail!("price {price} has more than {PRICE_DECIMALS} decimals");
        }
    }

    match parse_units(price, PRICE_DECIMALS)? {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => bail!("price must not be negative: {price}"),
    }
}

pub fn parse_limit(limit: &str) -> Result<U256> {
    U256::from_dec_str(limit.trim()).map_err(|e| anyhow!("invalid limit {limit}: {e:?}"))
}

/// Builds the `createDeSurveyNFT` call against the factory recorded for `network`.
pub fn create_call<M: Middleware>(
    client: Arc<M>,
    addresses: &Registry,
    network: &str,
    price: &str,
    limit: &str,
) -> Result<ContractCall<M, ()>> {
    let price = parse_price(price)?;
    let limit = parse_limit(limit)?;

    let factory_address = addresses.address_of(network, FACTORY)?;
    log::info!(
        "calling createDeSurveyNFT(price: {price}, limit: {limit}) on {}",
        checksum(factory_address)
    );

    Ok(DeSurveyNFTFactory::new(factory_address, client)
        .create_de_survey_nft(price, limit)
        .legacy())
}

/// Creates a new survey NFT collection and waits for its receipt.
pub async fn create(
    client: Arc<Client>,
    addresses: &Registry,
    network: &str,
    price: &str,
    limit: &str,
) -> Result<TransactionReceipt> {
    let receipt = create_call(client, addresses, network, price, limit)?
        .send()
        .await?
        .await?
        .ok_or(anyhow!("transaction receipt not found"))?;

    print_receipt(&receipt)?;
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use ethers::{
        abi::{self, Token},
        providers::Provider,
        signers::LocalWallet,
        middleware::SignerMiddleware,
        types::NameOrAddress,
        utils::id,
    };

    use super::*;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const FACTORY_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn registry() -> Registry {
        let dir = tempfile::tempdir().unwrap();
        let mut addresses = Registry::load(dir.path().join("addresses.json")).unwrap();
        addresses.insert("bnbtest", FACTORY, FACTORY_ADDRESS);
        addresses
    }

    #[test]
    fn call_encodes_price_in_base_units() {
        let (provider, _mock) = Provider::mocked();
        let wallet: LocalWallet = DEV_KEY.parse().unwrap();
        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        let call = create_call(client, &registry(), "bnbtest", "1.5", "100").unwrap();

        let mut expected = id("createDeSurveyNFT(uint256,uint256)").to_vec();
        expected.extend(abi::encode(&[
            Token::Uint(U256::from_dec_str("1500000000000000000").unwrap()),
            Token::Uint(U256::from(100u64)),
        ]));
        assert_eq!(call.calldata().unwrap().to_vec(), expected);
        assert_eq!(
            call.tx.to(),
            Some(&NameOrAddress::Address(FACTORY_ADDRESS.parse().unwrap()))
        );
    }

    #[test]
    fn call_requires_recorded_factory_and_valid_params() {
        let (provider, _mock) = Provider::mocked();
        let client = Arc::new(provider);

        assert!(create_call(client.clone(), &registry(), "bnb", "1.5", "100").is_err());
        assert!(create_call(client, &registry(), "bnbtest", "1.5", "ten").is_err());
    }

    #[test]
    fn price_is_converted_to_base_units() {
        assert_eq!(
            parse_price("1.5").unwrap(),
            U256::from_dec_str("1500000000000000000").unwrap()
        );
        assert_eq!(parse_price("0").unwrap(), U256::zero());
        assert_eq!(
            parse_price("0.000000000000000001").unwrap(),
            U256::one()
        );
        assert_eq!(parse_price(" 2 ").unwrap(), U256::exp10(18) * U256::from(2u64));
    }

    #[test]
    fn invalid_prices_are_rejected() {
        assert!(parse_price("-1").is_err());
        assert!(parse_price("abc").is_err());
    }

    #[test]
    fn price_with_excess_decimals_is_rejected() {
        assert!(parse_price("1.0000000000000000009").is_err());
        assert!(parse_price("0.0000000000000000001").is_err());
        assert_eq!(
            parse_price("1.000000000000000009").unwrap(),
            U256::from_dec_str("1000000000000000009").unwrap()
        );
    }

    #[test]
    fn limit_is_a_decimal_integer() {
        assert_eq!(parse_limit("100").unwrap(), U256::from(100u64));
        assert!(parse_limit("1.5").is_err());
        assert!(parse_limit("0x10").is_err());
    }
}
