//! Checkup status and the flat result map handed back to the framework.

use serde::Serialize;
use std::collections::BTreeMap;

pub const TRAFFIC_GEN_SENT_PACKETS_KEY: &str = "trafficGenSentPackets";
pub const TRAFFIC_GEN_OUTPUT_ERROR_PACKETS_KEY: &str = "trafficGenOutputErrorPackets";
pub const TRAFFIC_GEN_INPUT_ERROR_PACKETS_KEY: &str = "trafficGenInputErrorPackets";
pub const DPDK_RX_TEST_PACKETS_KEY: &str = "DPDKRxTestPackets";
pub const DPDK_RX_DROPS_KEY: &str = "DPDKRxPacketDrops";
pub const DPDK_TX_DROPS_KEY: &str = "DPDKTxPacketDrops";
pub const TRAFFIC_GEN_ACTUAL_NODE_NAME_KEY: &str = "trafficGenActualNodeName";
pub const VM_UNDER_TEST_ACTUAL_NODE_NAME_KEY: &str = "vmUnderTestActualNodeName";

/// Packet counters and placement collected by a checkup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckupResults {
    pub traffic_gen_sent_packets: u64,
    pub traffic_gen_output_error_packets: u64,
    pub traffic_gen_input_error_packets: u64,
    pub dpdk_rx_test_packets: u64,
    pub dpdk_packets_rx_dropped: u64,
    pub dpdk_packets_tx_dropped: u64,
    pub traffic_gen_actual_node_name: String,
    pub vm_under_test_actual_node_name: String,
}

/// Outcome of a checkup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckupStatus {
    pub succeeded: bool,
    pub failure_reason: Vec<String>,
    pub results: Option<CheckupResults>,
}

impl CheckupStatus {
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.failure_reason.push(reason.into());
    }

    /// Settle `succeeded` from the recorded failures.
    pub fn finalize(&mut self) {
        self.succeeded = self.failure_reason.is_empty();
    }
}

/// Render the results as the string map the framework persists.
///
/// Missing or all-default results render as an empty map.
pub fn format_results(status: &CheckupStatus) -> BTreeMap<String, String> {
    let results = match &status.results {
        Some(results) if *results != CheckupResults::default() => results,
        _ => return BTreeMap::new(),
    };

    [
        (TRAFFIC_GEN_SENT_PACKETS_KEY, results.traffic_gen_sent_packets.to_string()),
        (
            TRAFFIC_GEN_OUTPUT_ERROR_PACKETS_KEY,
            results.traffic_gen_output_error_packets.to_string(),
        ),
        (
            TRAFFIC_GEN_INPUT_ERROR_PACKETS_KEY,
            results.traffic_gen_input_error_packets.to_string(),
        ),
        (DPDK_RX_TEST_PACKETS_KEY, results.dpdk_rx_test_packets.to_string()),
        (DPDK_RX_DROPS_KEY, results.dpdk_packets_rx_dropped.to_string()),
        (DPDK_TX_DROPS_KEY, results.dpdk_packets_tx_dropped.to_string()),
        (
            TRAFFIC_GEN_ACTUAL_NODE_NAME_KEY,
            results.traffic_gen_actual_node_name.clone(),
        ),
        (
            VM_UNDER_TEST_ACTUAL_NODE_NAME_KEY,
            results.vm_under_test_actual_node_name.clone(),
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_results_format_to_empty_map() {
        let status = CheckupStatus::default();
        assert!(format_results(&status).is_empty());

        let status = CheckupStatus {
            results: Some(CheckupResults::default()),
            ..Default::default()
        };
        assert!(format_results(&status).is_empty());
    }

    #[test]
    fn test_results_format_every_key() {
        let status = CheckupStatus {
            succeeded: true,
            failure_reason: Vec::new(),
            results: Some(CheckupResults {
                traffic_gen_sent_packets: 1000,
                traffic_gen_output_error_packets: 1,
                traffic_gen_input_error_packets: 2,
                dpdk_rx_test_packets: 997,
                dpdk_packets_rx_dropped: 3,
                dpdk_packets_tx_dropped: 0,
                traffic_gen_actual_node_name: "worker-dpdk1".into(),
                vm_under_test_actual_node_name: "worker-dpdk2".into(),
            }),
        };

        let map = format_results(&status);
        assert_eq!(map.len(), 8);
        assert_eq!(map[TRAFFIC_GEN_SENT_PACKETS_KEY], "1000");
        assert_eq!(map[DPDK_RX_TEST_PACKETS_KEY], "997");
        assert_eq!(map[DPDK_TX_DROPS_KEY], "0");
        assert_eq!(map[VM_UNDER_TEST_ACTUAL_NODE_NAME_KEY], "worker-dpdk2");
    }

    #[test]
    fn test_finalize_tracks_failures() {
        let mut status = CheckupStatus::default();
        status.finalize();
        assert!(status.succeeded);

        status.fail("timeout waiting for trex-server to be ready");
        status.finalize();
        assert!(!status.succeeded);
    }
}
