//! Constants used in the deploy scripts

use std::time::Duration;

/// How long to wait after a deployment is confirmed before requesting
/// verification, giving the block explorer time to index the new code
pub const VERIFICATION_COOLDOWN: Duration = Duration::from_secs(60);

/// The interval between polls of the block explorer's verification status
pub const VERIFICATION_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The maximum number of verification status polls before giving up
pub const MAX_VERIFICATION_POLLS: usize = 12;

/// The timeout applied to each request made to the block explorer
pub const VERIFIER_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The default Etherscan-compatible verification API endpoint
pub const DEFAULT_VERIFIER_URL: &str = "https://api.etherscan.io/api";

/// The default directory containing the Hardhat compilation artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The subdirectory of the artifacts directory containing compiler build info,
/// which is never searched for contract artifacts
pub const BUILD_INFO_PATH_SEGMENT: &str = "build-info";

/// The extension of an artifact file
pub const ARTIFACT_EXTENSION: &str = "json";

/// The extension of a Hardhat debug file, which points at the build info
pub const DEBUG_FILE_EXTENSION: &str = "dbg.json";

/// The name of the proxy contract deployed in front of upgradeable contracts.
///
/// This is OpenZeppelin's v5 [`TransparentUpgradeableProxy`](https://docs.openzeppelin.com/contracts/5.x/api/proxy#transparent_proxy),
/// which deploys its own `ProxyAdmin` owned by the `initialOwner` constructor argument.
pub const PROXY_CONTRACT_NAME: &str = "TransparentUpgradeableProxy";

/// The proxy artifact shipped in the `@openzeppelin/contracts` package, which
/// Hardhat projects do not compile into their own artifacts directory
pub const DEFAULT_PROXY_ARTIFACT: &str =
    "node_modules/@openzeppelin/contracts/build/contracts/TransparentUpgradeableProxy.json";

/// The `UPGRADE_INTERFACE_VERSION` of a `ProxyAdmin` which only exposes `upgradeAndCall`
pub const UPGRADE_AND_CALL_ONLY_VERSION: &str = "5.0.0";

/// The storage slot containing the proxy admin contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The prefix marking a constructor argument as a configuration reference
pub const CONFIG_REF_PREFIX: char = '$';

/// Configuration key for the fee recipient address
pub const FEE_ADDRESS_KEY: &str = "FEE_ADDRESS";

/// Configuration key for the off-chain authorization signer address
pub const SIGNER_ADDRESS_KEY: &str = "SIGNER_ADDRESS";

/// Configuration key for the NFT collection address used by the claim contract
pub const COLLECTION_ADDRESS_KEY: &str = "COLLECTION_ADDRESS";

/// The name of the initializer invoked on freshly deployed proxies
pub const DEFAULT_INITIALIZER: &str = "initialize";

/// The staking factories seeded by the `initialize` command by default
pub const DEFAULT_STAKING_FACTORY_ADDRESSES: &str =
    "0xa292a8adaac47f04ea4af3fdb63119a1987d90e1,0x06438db8be430fb74821dbcfb34db1f4b35ac843";

/// The proxy upgraded by the `upgrade` command by default
pub const DEFAULT_PROXY_ADDRESS: &str = "0xc16d32ecf660290c9351a9c878d0d482235be233";

/// The implementation contract the `upgrade` command deploys by default
pub const DEFAULT_UPGRADE_CONTRACT: &str = "HexToysMarketV2";

/// The owner address passed to the `HexToysNFT` initializer
pub const HEXTOYS_NFT_OWNER: &str = "0xa7633f37FEEfaCAc8F251b914e92Ff03d2acf0f2";

/// The number of seconds in a 30 day month
pub const SECONDS_PER_MONTH: u64 = 2_592_000;
