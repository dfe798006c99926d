//! CLI configuration.

use crate::error::{CliError, CliResult};
use alloy::primitives::Address;
use hlsign_core::{Instrument, InstrumentBook, PerpMeta, SpotMeta};
use hlsign_signer::{
    Clock, KeySource, Network, RequestOptions, SigningIdentity, SystemClock, DEFAULT_SLIPPAGE,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default config path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable overriding the config path.
pub const CONFIG_ENV_VAR: &str = "HLSIGN_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub network: Network,

    /// Where the private key comes from.
    pub key: KeySource,

    /// Refuse to sign if the loaded key derives a different address.
    #[serde(default)]
    pub expected_address: Option<String>,

    /// Sign on behalf of this vault or sub-account.
    #[serde(default)]
    pub vault_address: Option<String>,

    /// Requests expire this many milliseconds after signing.
    #[serde(default)]
    pub expires_after_ms: Option<u64>,

    /// Market order slippage as a fraction (0.05 = 5%).
    #[serde(default = "default_slippage")]
    pub slippage: Decimal,

    /// Saved `meta` response (JSON) to build perp instruments from.
    #[serde(default)]
    pub perp_meta_path: Option<PathBuf>,

    /// Saved `spotMeta` response (JSON); only read with `perp_meta_path`.
    #[serde(default)]
    pub spot_meta_path: Option<PathBuf>,

    /// Instruments added on top of the metadata files.
    #[serde(default)]
    pub instruments: Vec<Instrument>,
}

fn default_slippage() -> Decimal {
    DEFAULT_SLIPPAGE
}

impl CliConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &str) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Failed to read config {path}: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.slippage <= Decimal::ZERO || self.slippage >= Decimal::ONE {
            return Err(CliError::Config(format!(
                "slippage must be in (0, 1), got {}",
                self.slippage
            )));
        }
        if self.instruments.is_empty() && self.perp_meta_path.is_none() {
            return Err(CliError::Config(
                "no instruments: set perp_meta_path or add [[instruments]]".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for inst in &self.instruments {
            if !seen.insert(inst.name.as_str()) {
                return Err(CliError::Config(format!(
                    "duplicate instrument: {}",
                    inst.name
                )));
            }
        }

        self.expected_address()?;
        self.vault_address()?;
        Ok(())
    }

    pub fn expected_address(&self) -> CliResult<Option<Address>> {
        parse_optional_address("expected_address", self.expected_address.as_deref())
    }

    pub fn vault_address(&self) -> CliResult<Option<Address>> {
        parse_optional_address("vault_address", self.vault_address.as_deref())
    }

    /// Load the signing key and check it against `expected_address`.
    pub fn load_identity(&self) -> CliResult<SigningIdentity> {
        Ok(SigningIdentity::load(&self.key, self.expected_address()?)?)
    }

    /// Metadata snapshot: metadata files first, then `[[instruments]]`, which
    /// replace entries of the same name.
    pub fn instrument_book(&self) -> CliResult<InstrumentBook> {
        let mut book = match &self.perp_meta_path {
            Some(perp_path) => {
                let perp: PerpMeta = read_json(perp_path)?;
                let spot: Option<SpotMeta> = self
                    .spot_meta_path
                    .as_deref()
                    .map(read_json)
                    .transpose()?;
                InstrumentBook::from_meta(&perp, spot.as_ref())
            }
            None => InstrumentBook::new(),
        };
        for inst in &self.instruments {
            book.insert(inst.clone());
        }
        Ok(book)
    }

    /// Options applied to every L1 request; expiry is relative to `now_ms`.
    pub fn request_options_at(&self, now_ms: u64) -> CliResult<RequestOptions> {
        Ok(RequestOptions {
            vault_address: self.vault_address()?,
            expires_after: self.expires_after_ms.map(|offset| now_ms + offset),
            builder: None,
        })
    }

    pub fn request_options(&self) -> CliResult<RequestOptions> {
        self.request_options_at(SystemClock.now_ms())
    }
}

fn parse_optional_address(field: &str, raw: Option<&str>) -> CliResult<Option<Address>> {
    raw.map(|s| {
        s.parse::<Address>()
            .map_err(|e| CliError::Config(format!("{field}: invalid address {s}: {e}")))
    })
    .transpose()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("Failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::Config(format!("Failed to parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    const MINIMAL: &str = r#"
network = "testnet"

[key]
kind = "env_var"
var_name = "HLSIGN_PRIVATE_KEY"

[[instruments]]
name = "BTC"
asset = 0
sz_decimals = 5
tick_size = "1"

[[instruments]]
name = "ETH"
asset = 1
sz_decimals = 4
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn load(content: &str) -> CliResult<CliConfig> {
        let file = write_config(content);
        CliConfig::from_file(file.path().to_str().unwrap())
    }

    #[test]
    fn test_minimal_config() {
        let config = load(MINIMAL).unwrap();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.slippage, dec!(0.05));
        assert_eq!(
            config.key,
            KeySource::EnvVar {
                var_name: "HLSIGN_PRIVATE_KEY".to_string()
            }
        );

        let book = config.instrument_book().unwrap();
        assert_eq!(book.len(), 2);
        assert_eq!(book.get("ETH").unwrap().asset, 1);
        assert_eq!(
            book.get("BTC").unwrap().tick_size(),
            hlsign_core::Price::new(dec!(1))
        );
    }

    #[test]
    fn test_request_options_from_config() {
        let content = MINIMAL.replacen(
            "network = \"testnet\"",
            "network = \"mainnet\"\nvault_address = \"0x1719884eb866cb12b2287399b15f7db5e7d775ea\"\nexpires_after_ms = 30000",
            1,
        );
        let config = load(&content).unwrap();
        assert_eq!(config.network, Network::Mainnet);

        let opts = config.request_options_at(1_000).unwrap();
        assert_eq!(opts.expires_after, Some(31_000));
        assert_eq!(
            opts.vault_address,
            Some("0x1719884eb866cb12b2287399b15f7db5e7d775ea".parse().unwrap())
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_slippage = MINIMAL.replacen(
            "network = \"testnet\"",
            "network = \"testnet\"\nslippage = \"1.5\"",
            1,
        );
        assert!(matches!(load(&bad_slippage), Err(CliError::Config(_))));

        let bad_vault = MINIMAL.replacen(
            "network = \"testnet\"",
            "network = \"testnet\"\nvault_address = \"0x1234\"",
            1,
        );
        assert!(matches!(load(&bad_vault), Err(CliError::Config(_))));

        let duplicate = format!("{MINIMAL}\n[[instruments]]\nname = \"BTC\"\nasset = 3\nsz_decimals = 2\n");
        assert!(matches!(load(&duplicate), Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CliConfig::from_file("/nonexistent/hlsign.toml"),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_book_from_meta_files() {
        let mut perp = tempfile::NamedTempFile::new().unwrap();
        write!(
            perp,
            r#"{{"universe":[{{"name":"BTC","szDecimals":5}},{{"name":"ETH","szDecimals":4}}]}}"#
        )
        .unwrap();

        let content = format!(
            "perp_meta_path = \"{}\"\n\n[key]\nkind = \"file\"\npath = \"/run/secrets/hlsign.key\"\n",
            perp.path().display()
        );

        let config = load(&content).unwrap();
        let book = config.instrument_book().unwrap();
        assert_eq!(book.get("ETH").unwrap().asset, 1);
        assert_eq!(book.get("BTC").unwrap().sz_decimals, 5);
    }

    #[test]
    fn test_load_identity_checks_expected_address() {
        let mut key = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            key,
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        )
        .unwrap();

        let content = format!(
            "expected_address = \"0x0000000000000000000000000000000000000001\"\n\n[key]\nkind = \"file\"\npath = \"{}\"\n\n[[instruments]]\nname = \"BTC\"\nasset = 0\nsz_decimals = 5\n",
            key.path().display()
        );
        let config = load(&content).unwrap();
        assert!(matches!(config.load_identity(), Err(CliError::Key(_))));
    }
}
