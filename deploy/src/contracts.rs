use ethers::contract::abigen;

/// Registry and artifact name of the factory contract.
pub const FACTORY: &str = "DeSurveyNFTFactory";

/// Registry and artifact name of the admin contract owning every proxy.
pub const PROXY_ADMIN: &str = "ProxyAdmin";

pub const TRANSPARENT_PROXY: &str = "TransparentUpgradeableProxy";

/// Method called through the proxy right after construction.
pub const INITIALIZER: &str = "initialize";

abigen!(
    DeSurveyNFTFactory,
    r#"[
        function initialize() external
        function createDeSurveyNFT(uint256 price, uint256 limit) external
    ]"#
);

abigen!(
    ProxyAdmin,
    r#"[
        function upgrade(address proxy, address implementation) external
        function getProxyImplementation(address proxy) external view returns (address)
        function owner() external view returns (address)
    ]"#
);
