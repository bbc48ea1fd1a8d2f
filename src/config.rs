//! Checkup parameters.
//!
//! The orchestration framework hands the checkup a flat string-to-string
//! parameter map. [`CheckupConfig::from_params`] validates it and fills in
//! defaults for the optional entries. For local runs the same map can be
//! written as the `[params]` table of a TOML file.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const NUMA_SOCKET_PARAM: &str = "numaSocket";
pub const NETWORK_ATTACHMENT_DEFINITION_NAME_PARAM: &str = "networkAttachmentDefinitionName";
pub const PORT_BANDWIDTH_GB_PARAM: &str = "portBandwidthGB";
pub const TRAFFIC_GENERATOR_NODE_LABEL_SELECTOR_PARAM: &str = "trafficGeneratorNodeLabelSelector";
pub const TRAFFIC_GENERATOR_PACKETS_PER_SECOND_IN_MILLIONS_PARAM: &str =
    "trafficGeneratorPacketsPerSecondInMillions";
pub const DPDK_NODE_LABEL_SELECTOR_PARAM: &str = "DPDKNodeLabelSelector";
pub const TRAFFIC_GENERATOR_EAST_MAC_ADDRESS_PARAM: &str = "trafficGeneratorEastMacAddress";
pub const DPDK_MAC_ADDRESS_PARAM: &str = "DPDKMacAddress";
pub const TEST_DURATION_PARAM: &str = "testDuration";

pub const PORT_BANDWIDTH_GB_DEFAULT: u32 = 10;
pub const TRAFFIC_GENERATOR_PACKETS_PER_SECOND_IN_MILLIONS_DEFAULT: u32 = 14;
pub const TRAFFIC_GENERATOR_EAST_MAC_ADDRESS_DEFAULT: MacAddress =
    MacAddress([0x50, 0x00, 0x00, 0x00, 0x00, 0x01]);
pub const DPDK_MAC_ADDRESS_DEFAULT: MacAddress = MacAddress([0x60, 0x00, 0x00, 0x00, 0x00, 0x01]);
pub const TEST_DURATION_DEFAULT: Duration = Duration::from_secs(5 * 60);

/// A 48-bit Ethernet address, written `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl FromStr for MacAddress {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sep = if s.contains('-') { '-' } else { ':' };
        let mut octets = [0u8; 6];
        let mut parts = s.split(sep);
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or(())?;
            if part.len() != 2 {
                return Err(());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| ())?;
        }
        if parts.next().is_some() {
            return Err(());
        }
        Ok(MacAddress(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Validated checkup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckupConfig {
    pub pod_name: String,
    pub pod_uid: String,
    pub numa_socket: u32,
    pub network_attachment_definition_name: String,
    pub port_bandwidth_gb: u32,
    pub traffic_generator_node_label_selector: String,
    pub traffic_generator_packets_per_second_in_millions: u32,
    pub dpdk_node_label_selector: String,
    pub traffic_generator_east_mac_address: MacAddress,
    pub dpdk_mac_address: MacAddress,
    #[serde(serialize_with = "serialize_duration")]
    pub test_duration: Duration,
}

impl CheckupConfig {
    /// Validate `params` and apply defaults for missing optional entries.
    ///
    /// An optional entry that is present must still be valid; only a missing
    /// key falls back to its default.
    pub fn from_params(
        pod_name: impl Into<String>,
        pod_uid: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let numa_socket = params
            .get(NUMA_SOCKET_PARAM)
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| {
                ConfigError::InvalidNumaSocket(param_or_empty(params, NUMA_SOCKET_PARAM))
            })?;

        let network_attachment_definition_name = params
            .get(NETWORK_ATTACHMENT_DEFINITION_NAME_PARAM)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| {
                ConfigError::InvalidNetworkAttachmentDefinitionName(param_or_empty(
                    params,
                    NETWORK_ATTACHMENT_DEFINITION_NAME_PARAM,
                ))
            })?;

        let port_bandwidth_gb = optional(
            params,
            PORT_BANDWIDTH_GB_PARAM,
            PORT_BANDWIDTH_GB_DEFAULT,
            parse_positive,
            ConfigError::InvalidPortBandwidthGb,
        )?;

        let traffic_generator_packets_per_second_in_millions = optional(
            params,
            TRAFFIC_GENERATOR_PACKETS_PER_SECOND_IN_MILLIONS_PARAM,
            TRAFFIC_GENERATOR_PACKETS_PER_SECOND_IN_MILLIONS_DEFAULT,
            parse_positive,
            ConfigError::InvalidTrafficGeneratorPacketsPerSecondInMillions,
        )?;

        let traffic_generator_east_mac_address = optional(
            params,
            TRAFFIC_GENERATOR_EAST_MAC_ADDRESS_PARAM,
            TRAFFIC_GENERATOR_EAST_MAC_ADDRESS_DEFAULT,
            |v| v.parse().ok(),
            ConfigError::InvalidTrafficGeneratorEastMacAddress,
        )?;

        let dpdk_mac_address = optional(
            params,
            DPDK_MAC_ADDRESS_PARAM,
            DPDK_MAC_ADDRESS_DEFAULT,
            |v| v.parse().ok(),
            ConfigError::InvalidDpdkMacAddress,
        )?;

        let test_duration = optional(
            params,
            TEST_DURATION_PARAM,
            TEST_DURATION_DEFAULT,
            |v| humantime::parse_duration(v).ok(),
            ConfigError::InvalidTestDuration,
        )?;

        Ok(Self {
            pod_name: pod_name.into(),
            pod_uid: pod_uid.into(),
            numa_socket,
            network_attachment_definition_name,
            port_bandwidth_gb,
            traffic_generator_node_label_selector: params
                .get(TRAFFIC_GENERATOR_NODE_LABEL_SELECTOR_PARAM)
                .cloned()
                .unwrap_or_default(),
            traffic_generator_packets_per_second_in_millions,
            dpdk_node_label_selector: params
                .get(DPDK_NODE_LABEL_SELECTOR_PARAM)
                .cloned()
                .unwrap_or_default(),
            traffic_generator_east_mac_address,
            dpdk_mac_address,
            test_duration,
        })
    }

    /// Parse a TOML parameter file and validate it.
    ///
    /// ```toml
    /// podName = "dpdk-checkup-abcde"
    /// podUid = "0123456789"
    ///
    /// [params]
    /// numaSocket = 0
    /// networkAttachmentDefinitionName = "intel-dpdk-network1"
    /// testDuration = "30m"
    /// ```
    ///
    /// Parameter values may be TOML strings, integers or booleans.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ParameterFile =
            toml::from_str(contents).map_err(|e| ConfigError::ParameterFile(e.to_string()))?;

        let mut params = HashMap::with_capacity(file.params.len());
        for (key, value) in file.params {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(ConfigError::ParameterFile(format!(
                        "parameter '{}' must be a string, integer or boolean, got {}",
                        key,
                        other.type_str()
                    )))
                }
            };
            params.insert(key, value);
        }

        Self::from_params(file.pod_name, file.pod_uid, &params)
    }

    /// Log every effective setting, one line each.
    pub fn log_summary(&self) {
        tracing::info!("Using the following config:");
        tracing::info!("\t{:?}: {:?}", NUMA_SOCKET_PARAM, self.numa_socket);
        tracing::info!(
            "\t{:?}: {:?}",
            NETWORK_ATTACHMENT_DEFINITION_NAME_PARAM,
            self.network_attachment_definition_name
        );
        tracing::info!("\t{:?}: {:?}", PORT_BANDWIDTH_GB_PARAM, self.port_bandwidth_gb);
        tracing::info!(
            "\t{:?}: {:?}",
            TRAFFIC_GENERATOR_NODE_LABEL_SELECTOR_PARAM,
            self.traffic_generator_node_label_selector
        );
        tracing::info!(
            "\t{:?}: {:?}",
            TRAFFIC_GENERATOR_PACKETS_PER_SECOND_IN_MILLIONS_PARAM,
            self.traffic_generator_packets_per_second_in_millions
        );
        tracing::info!(
            "\t{:?}: {:?}",
            DPDK_NODE_LABEL_SELECTOR_PARAM,
            self.dpdk_node_label_selector
        );
        tracing::info!(
            "\t{:?}: \"{}\"",
            TRAFFIC_GENERATOR_EAST_MAC_ADDRESS_PARAM,
            self.traffic_generator_east_mac_address
        );
        tracing::info!("\t{:?}: \"{}\"", DPDK_MAC_ADDRESS_PARAM, self.dpdk_mac_address);
        tracing::info!(
            "\t{:?}: \"{}\"",
            TEST_DURATION_PARAM,
            humantime::format_duration(self.test_duration)
        );
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParameterFile {
    #[serde(default)]
    pod_name: String,
    #[serde(default)]
    pod_uid: String,
    #[serde(default)]
    params: BTreeMap<String, toml::Value>,
}

fn optional<T>(
    params: &HashMap<String, String>,
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
    invalid: impl Fn(String) -> ConfigError,
) -> Result<T, ConfigError> {
    match params.get(key) {
        None => Ok(default),
        Some(raw) => parse(raw).ok_or_else(|| invalid(raw.clone())),
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|v| *v > 0)
}

fn param_or_empty(params: &HashMap<String, String>, key: &str) -> String {
    params.get(key).cloned().unwrap_or_default()
}

fn serialize_duration<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*d))
}
