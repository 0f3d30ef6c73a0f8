// Protocol deployment configuration

use alloy_primitives::{address, Address};
use anyhow::{Context, Result};

use crate::models::Currency;

/// Fixed-point decimals shared by every token amount in the protocol.
pub const TOKEN_DECIMALS: u32 = 6;

/// Base Sepolia
pub const DEFAULT_CHAIN_ID: u64 = 84532;

const DEFAULT_EXPLORER_API_URL: &str = "https://base-sepolia.blockscout.com";

/// RYVYN contract addresses for one deployment
#[derive(Debug, Clone)]
pub struct Contracts {
    // ryUSD track
    pub mock_usdc: Address,
    pub ry_usd: Address,
    pub treasury_manager: Address,
    // ryIDR track
    pub mock_idrx: Address,
    pub ry_idr: Address,
    pub treasury_manager_idr: Address,
    // shared
    pub ry_bond: Address,
    pub ryvyn_handler: Address,
    pub yield_manager: Address,
    pub prediction_boost: Address,
}

impl Contracts {
    /// Current Base Sepolia deployment.
    pub fn base_sepolia() -> Self {
        Self {
            mock_usdc: address!("1DD9b73F49Ad7e9874287f502c6871ce3Df641cC"),
            ry_usd: address!("9e94BC6b8D81e94D5272d8e2F2BcCAC267C50E88"),
            treasury_manager: address!("c6841f2d1900d239579B809b1fc8D1b5D0716Eee"),
            mock_idrx: address!("4190dBd17d4719df007ED0a7b2EA0226d96e4fb4"),
            ry_idr: address!("5403ff9c5c173eEe01255Eeb4d0925bD21748311"),
            treasury_manager_idr: address!("172B748B60BC0aC2590628024cdfD1D90ce47BfA"),
            ry_bond: address!("e01FbFE0ed0B27563869b2495eA77775A7183e5E"),
            ryvyn_handler: address!("983ae30F3530442D8889999f81E296CA7a336f93"),
            yield_manager: address!("EF835c04113FC566028B537B18cA0B1E9d745b80"),
            prediction_boost: address!("3D2809D8842E6f89cC4A0aD51DaaCaf34406676f"),
        }
    }
}

/// Per-track token and treasury addresses plus display metadata
#[derive(Debug, Clone)]
pub struct CurrencyConfig {
    pub currency: Currency,
    /// USDC or IDRX.
    pub underlying_token: Address,
    /// ryUSD or ryIDR.
    pub stablecoin: Address,
    pub treasury_manager: Address,
    pub symbol: &'static str,
    pub underlying_symbol: &'static str,
    pub decimals: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub explorer_api_url: String,
    pub chain_id: u64,
    pub port: u16,
    pub contracts: Contracts,
}

impl Config {
    /// Build the configuration from the environment. `RPC_URL` is required;
    /// everything else falls back to the Base Sepolia deployment defaults.
    pub fn from_env() -> Result<Self> {
        let rpc_url = std::env::var("RPC_URL").context("RPC_URL must be set in environment")?;
        let explorer_api_url = std::env::var("EXPLORER_API_URL")
            .unwrap_or_else(|_| DEFAULT_EXPLORER_API_URL.to_string());
        let chain_id = match std::env::var("CHAIN_ID") {
            Ok(raw) => raw.parse::<u64>().context("CHAIN_ID must be a number")?,
            Err(_) => DEFAULT_CHAIN_ID,
        };
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse::<u16>()
            .context("PORT must be a number")?;

        Ok(Self {
            rpc_url,
            explorer_api_url,
            chain_id,
            port,
            contracts: Contracts::base_sepolia(),
        })
    }

    pub fn currency_config(&self, currency: Currency) -> CurrencyConfig {
        match currency {
            Currency::USD => CurrencyConfig {
                currency,
                underlying_token: self.contracts.mock_usdc,
                stablecoin: self.contracts.ry_usd,
                treasury_manager: self.contracts.treasury_manager,
                symbol: "ryUSD",
                underlying_symbol: "USDC",
                decimals: TOKEN_DECIMALS,
            },
            Currency::IDR => CurrencyConfig {
                currency,
                underlying_token: self.contracts.mock_idrx,
                stablecoin: self.contracts.ry_idr,
                treasury_manager: self.contracts.treasury_manager_idr,
                symbol: "ryIDR",
                underlying_symbol: "IDRX",
                decimals: TOKEN_DECIMALS,
            },
        }
    }
}
