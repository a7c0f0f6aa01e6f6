//! Per-device datapoint bridge
//!
//! One [`DpBridge`] per device instance. Inbound MCU frames are decoded
//! and fanned out into the target-cluster cache; outbound attribute
//! writes become single-datapoint set-data frames tracked by sequence
//! number until the device acknowledges or the wait times out.

use crate::cluster::{AttributeValue, ClusterSet, OnOffCommand, ZclStatus};
use crate::cluster::{attr, id};
use crate::mapping::MappingTable;
use crate::models::{AutoClearSpec, DeviceModel};
use crate::timer::ResetTimer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tuya_protocol::{
    DatapointRecord, TuyaCommand, TuyaFrame, TypedValue, ZclFrame, TUYA_MCU_CLUSTER,
};

/// Default acknowledgment timeout for outbound set-data requests
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Encoded frame handed to the radio transport
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub cluster_id: u16,
    /// Serialized ZCL frame (header + MCU payload)
    pub payload: Vec<u8>,
}

/// Result of dispatching one inbound datapoint record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Number of attribute updates written
    Applied(usize),
    /// No mapping for this dp_id; skipped without error
    Unmapped,
    /// Mapped but the payload or conversion was unusable
    Skipped,
}

/// Outbound request awaiting its acknowledgment
struct PendingCommand {
    response_tx: oneshot::Sender<ZclStatus>,
}

/// Datapoint bridge for one device
pub struct DpBridge {
    model: &'static DeviceModel,
    table: MappingTable,
    clusters: ClusterSet,
    /// Sequence counter for outbound frames; starts at 1, wraps at the
    /// 16-bit field width
    sequence: AtomicU16,
    /// At most one request is expected in flight, but replies are matched
    /// by sequence regardless
    pending: Arc<Mutex<HashMap<u16, PendingCommand>>>,
    frame_tx: mpsc::Sender<OutboundFrame>,
    timers: HashMap<u8, (&'static AutoClearSpec, ResetTimer)>,
}

impl DpBridge {
    /// Build a bridge for a device model
    ///
    /// Returns the bridge and the receiving end of the outbound frame
    /// channel, which the caller hands to the radio transport.
    #[must_use]
    pub fn new(model: &'static DeviceModel) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let table = MappingTable::new(model.mappings);

        let mut cluster_ids = table.cluster_ids();
        for spec in model.auto_clear {
            cluster_ids.push(spec.target.cluster_id);
        }
        cluster_ids.sort_unstable();
        cluster_ids.dedup();
        let clusters = ClusterSet::new(cluster_ids);

        let timers = model
            .auto_clear
            .iter()
            .map(|spec| {
                let timer = ResetTimer::new(
                    clusters.clone(),
                    spec.target,
                    spec.clear_value.clone(),
                    Duration::from_secs(spec.seconds),
                );
                (spec.dp_id, (spec, timer))
            })
            .collect();

        let (frame_tx, frame_rx) = mpsc::channel(32);

        tracing::debug!("Built datapoint bridge for {}", model.model);

        (
            Self {
                model,
                table,
                clusters,
                sequence: AtomicU16::new(1),
                pending: Arc::new(Mutex::new(HashMap::new())),
                frame_tx,
                timers,
            },
            frame_rx,
        )
    }

    #[must_use]
    pub fn model(&self) -> &'static str {
        self.model.model
    }

    /// The target-cluster cache this bridge writes into
    #[must_use]
    pub fn clusters(&self) -> &ClusterSet {
        &self.clusters
    }

    /// Handle the ASDU of an inbound manufacturer cluster command
    pub async fn handle_zcl(&self, asdu: &[u8]) {
        let zcl = match ZclFrame::parse(asdu) {
            Ok(zcl) => zcl,
            Err(e) => {
                tracing::warn!("Undecodable ZCL frame: {}", e);
                return;
            }
        };
        if !zcl.is_cluster_specific() {
            tracing::debug!("Ignoring global command {:#04X}", zcl.command_id());
            return;
        }
        match zcl.to_tuya_frame() {
            Ok(frame) => self.handle_frame(&frame).await,
            Err(e) => tracing::warn!("Undecodable MCU payload: {}", e),
        }
    }

    /// Handle a decoded MCU frame
    ///
    /// Reports and responses both carry datapoints; a response additionally
    /// acknowledges the pending request with a matching sequence number.
    /// Sequence numbers that match nothing are tolerated — spontaneous
    /// reports are not replies.
    pub async fn handle_frame(&self, frame: &TuyaFrame) {
        match frame.command {
            TuyaCommand::DataResponse => {
                self.resolve_pending(frame.seq).await;
                self.dispatch_all(frame);
            }
            TuyaCommand::DataReport => self.dispatch_all(frame),
            TuyaCommand::McuVersionResponse => {
                tracing::info!("{}: MCU version frame seq={}", self.model.model, frame.seq);
            }
            other => {
                tracing::debug!("Ignoring inbound {:?} frame", other);
            }
        }
    }

    fn dispatch_all(&self, frame: &TuyaFrame) {
        // Wire order, never sorted by id
        for record in &frame.datapoints {
            self.dispatch_record(record);
        }
    }

    /// Apply one datapoint record to the target clusters
    pub fn dispatch_record(&self, record: &DatapointRecord) -> DispatchOutcome {
        let Some(mapping) = self.table.by_dp(record.dp_id) else {
            tracing::debug!(
                "{}: unmapped datapoint {:#04X}, skipping",
                self.model.model,
                record.dp_id
            );
            return DispatchOutcome::Unmapped;
        };

        // The table's declared type wins over the wire dp_type
        let value = match TypedValue::decode(mapping.dp_type, &record.payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("{}: dp {:#04X}: {}", self.model.model, record.dp_id, e);
                return DispatchOutcome::Skipped;
            }
        };

        let values = match mapping.inbound.apply(&value, &self.clusters) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("{}: dp {:#04X}: {}", self.model.model, record.dp_id, e);
                return DispatchOutcome::Skipped;
            }
        };

        let first_value = values.first().cloned();
        let mut applied = 0;
        for (target, value) in mapping.targets.iter().zip(values) {
            self.clusters
                .write_attribute(target.cluster_id, target.attribute, value);
            applied += 1;
        }

        if let Some((spec, timer)) = self.timers.get(&record.dp_id) {
            match first_value {
                Some(ref value) if *value == spec.clear_value => timer.cancel(),
                Some(_) => timer.trigger(),
                None => {}
            }
        }

        DispatchOutcome::Applied(applied)
    }

    async fn resolve_pending(&self, seq: u16) {
        let mut pending = self.pending.lock().await;
        if let Some(request) = pending.remove(&seq) {
            let _ = request.response_tx.send(ZclStatus::Success);
        } else {
            tracing::debug!("Response seq={} matches no pending request", seq);
        }
    }

    /// Read a cached attribute value
    ///
    /// An attribute with no mapping is reported as unsupported; a mapped
    /// attribute the device has not reported yet fails soft.
    pub fn read_attribute(&self, cluster_id: u16, attribute: &'static str) -> Result<AttributeValue, ZclStatus> {
        if let Some(value) = self.clusters.read_attribute(cluster_id, attribute) {
            return Ok(value);
        }
        if self.table.by_attribute(cluster_id, attribute).is_some() {
            Err(ZclStatus::Failure)
        } else {
            Err(ZclStatus::UnsupportedAttribute)
        }
    }

    /// Write a standard attribute through its reverse mapping
    pub async fn write_attribute(
        &self,
        cluster_id: u16,
        attribute: &str,
        value: AttributeValue,
    ) -> ZclStatus {
        self.write_attribute_timeout(cluster_id, attribute, value, DEFAULT_ACK_TIMEOUT)
            .await
    }

    /// Write with a custom acknowledgment timeout
    pub async fn write_attribute_timeout(
        &self,
        cluster_id: u16,
        attribute: &str,
        value: AttributeValue,
        ack_timeout: Duration,
    ) -> ZclStatus {
        let Some(mapping) = self.table.by_attribute(cluster_id, attribute) else {
            tracing::debug!(
                "{}: no reverse mapping for {:#06X}:{}",
                self.model.model,
                cluster_id,
                attribute
            );
            return ZclStatus::UnsupportedClusterCommand;
        };
        let Some(outbound) = mapping.outbound else {
            tracing::debug!(
                "{}: dp {:#04X} is read-only",
                self.model.model,
                mapping.dp_id
            );
            return ZclStatus::UnsupportedClusterCommand;
        };

        let typed = match outbound.apply(mapping.dp_type, &value) {
            Ok(typed) => typed,
            Err(e) => {
                tracing::warn!("{}: outbound {}: {}", self.model.model, attribute, e);
                return ZclStatus::InvalidValue;
            }
        };

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let record = DatapointRecord::new(mapping.dp_id, mapping.dp_type, typed.encode());
        let frame = TuyaFrame::set_data(seq, record);
        let zcl = ZclFrame::cluster_command(
            (seq & 0xFF) as u8,
            TuyaCommand::SetData as u8,
            frame.encode(),
        );

        let (response_tx, response_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(seq, PendingCommand { response_tx });
        }

        let outbound_frame = OutboundFrame {
            cluster_id: TUYA_MCU_CLUSTER,
            payload: zcl.serialize(),
        };
        if self.frame_tx.send(outbound_frame).await.is_err() {
            tracing::warn!("{}: transport channel closed", self.model.model);
            self.pending.lock().await.remove(&seq);
            return ZclStatus::Failure;
        }

        tracing::debug!(
            "{}: sent set_data seq={} dp={:#04X}",
            self.model.model,
            seq,
            mapping.dp_id
        );

        match tokio::time::timeout(ack_timeout, response_rx).await {
            Ok(Ok(status)) => status,
            Ok(Err(_)) => ZclStatus::Failure,
            Err(_) => {
                // Never leave the caller suspended; surface the failure
                // through the same path an acknowledgment would use
                self.pending.lock().await.remove(&seq);
                tracing::warn!("{}: set_data seq={} timed out", self.model.model, seq);
                ZclStatus::Timeout
            }
        }
    }

    /// Service an On/Off cluster command invocation
    pub async fn invoke_on_off(&self, command: OnOffCommand) -> ZclStatus {
        let on = match command {
            OnOffCommand::On => true,
            OnOffCommand::Off => false,
            OnOffCommand::Toggle => !matches!(
                self.clusters.read_attribute(id::ON_OFF, attr::ON_OFF),
                Some(AttributeValue::Bool(true))
            ),
        };
        self.write_attribute(id::ON_OFF, attr::ON_OFF, AttributeValue::Bool(on))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models;
    use tuya_protocol::DpType;

    /// Scenario: `09 70 02 00 02 69 02 00 04 00 00 00 B3`
    #[tokio::test]
    async fn test_report_scales_temperature() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_THERMOSTAT);
        let wire = [0x09, 0x70, 0x02, 0x00, 0x02, 0x69, 0x02, 0x00, 0x04, 0x00, 0x00, 0x00, 0xB3];

        bridge.handle_zcl(&wire).await;

        assert_eq!(
            bridge.read_attribute(id::THERMOSTAT, attr::LOCAL_TEMPERATURE),
            Ok(AttributeValue::Number(1790))
        );
    }

    /// Scenario: `09 56 02 00 21 6C 01 00 01 01`
    #[tokio::test]
    async fn test_report_inverts_frost_lock() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_THERMOSTAT);
        let wire = [0x09, 0x56, 0x02, 0x00, 0x21, 0x6C, 0x01, 0x00, 0x01, 0x01];

        bridge.handle_zcl(&wire).await;

        assert_eq!(
            bridge.read_attribute(id::THERMOSTAT, attr::FROST_LOCK),
            Ok(AttributeValue::Bool(false))
        );
    }

    /// Scenario: outbound setpoint write divides by 100 and encodes one
    /// VALUE record
    #[tokio::test(start_paused = true)]
    async fn test_write_setpoint_builds_single_record_frame() {
        let (bridge, mut rx) = DpBridge::new(&models::TS0601_THERMOSTAT);

        let write = tokio::spawn(async move {
            bridge
                .write_attribute(
                    id::THERMOSTAT,
                    attr::OCCUPIED_HEATING_SETPOINT,
                    AttributeValue::Number(2500),
                )
                .await
        });

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.cluster_id, TUYA_MCU_CLUSTER);
        // frame_control | tsn | command | seq(2 BE) | dp record
        assert_eq!(
            frame.payload,
            vec![0x01, 0x01, 0x00, 0x00, 0x01, 0x10, 0x02, 0x00, 0x04, 0x00, 0x00, 0x00, 0x19]
        );

        // The write itself is still pending; times out without a response
        drop(rx);
        let status = write.await.unwrap();
        assert_eq!(status, ZclStatus::Timeout);
    }

    #[tokio::test]
    async fn test_response_resolves_pending_write() {
        let (bridge, mut rx) = DpBridge::new(&models::TS0601_THERMOSTAT);
        let bridge = Arc::new(bridge);

        let writer = bridge.clone();
        let write = tokio::spawn(async move {
            writer
                .write_attribute(id::ON_OFF, attr::ON_OFF, AttributeValue::Bool(true))
                .await
        });

        let frame = rx.recv().await.unwrap();
        let zcl = ZclFrame::parse(&frame.payload).unwrap();
        let sent = zcl.to_tuya_frame().unwrap();
        assert_eq!(sent.seq, 1); // counter starts at 1
        assert_eq!(sent.datapoints.len(), 1); // one record per frame

        // Device acknowledges with a response echoing the state
        let response = TuyaFrame {
            command: TuyaCommand::DataResponse,
            seq: sent.seq,
            datapoints: vec![DatapointRecord::new(0x01, DpType::Bool, vec![0x01])],
        };
        bridge.handle_frame(&response).await;

        assert_eq!(write.await.unwrap(), ZclStatus::Success);
        assert_eq!(
            bridge.read_attribute(id::ON_OFF, attr::ON_OFF),
            Ok(AttributeValue::Bool(true))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_times_out_without_response() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_THERMOSTAT);

        let status = bridge
            .write_attribute(id::ON_OFF, attr::ON_OFF, AttributeValue::Bool(false))
            .await;

        assert_eq!(status, ZclStatus::Timeout);
    }

    #[tokio::test]
    async fn test_unsupported_write_skips_transport() {
        let (bridge, mut rx) = DpBridge::new(&models::TS0601_THERMOSTAT);

        // No mapping at all
        let status = bridge
            .write_attribute(id::ON_OFF, "nonexistent", AttributeValue::Bool(true))
            .await;
        assert_eq!(status, ZclStatus::UnsupportedClusterCommand);

        // Mapped but read-only
        let status = bridge
            .write_attribute(
                id::THERMOSTAT,
                attr::LOCAL_TEMPERATURE,
                AttributeValue::Number(2000),
            )
            .await;
        assert_eq!(status, ZclStatus::UnsupportedClusterCommand);

        // Nothing reached the transport
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unmapped_report_is_skipped() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_THERMOSTAT);

        let record = DatapointRecord::new(0x7F, DpType::Bool, vec![0x01]);
        assert_eq!(bridge.dispatch_record(&record), DispatchOutcome::Unmapped);

        assert_eq!(
            bridge.read_attribute(id::THERMOSTAT, "unknown_attr"),
            Err(ZclStatus::UnsupportedAttribute)
        );
    }

    #[tokio::test]
    async fn test_raw_fanout_in_declared_order() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_DIN_METER);
        let mut reports = bridge.clusters().subscribe();

        // voltage 229.7 V | current 3210 mA | power 715 W
        let record = DatapointRecord::new(
            0x06,
            DpType::Raw,
            vec![0x08, 0xF9, 0x00, 0x0C, 0x8A, 0x00, 0x02, 0xCB],
        );
        assert_eq!(bridge.dispatch_record(&record), DispatchOutcome::Applied(3));

        let first = reports.try_recv().unwrap();
        assert_eq!(first.attribute, attr::RMS_VOLTAGE);
        assert_eq!(first.value, AttributeValue::Number(229));
        let second = reports.try_recv().unwrap();
        assert_eq!(second.attribute, attr::RMS_CURRENT);
        assert_eq!(second.value, AttributeValue::Number(3210));
        let third = reports.try_recv().unwrap();
        assert_eq!(third.attribute, attr::ACTIVE_POWER);
        assert_eq!(third.value, AttributeValue::Number(715));
    }

    #[tokio::test]
    async fn test_dispatch_is_idempotent() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_DIN_METER);
        let record = DatapointRecord::new(
            0x06,
            DpType::Raw,
            vec![0x08, 0xF9, 0x00, 0x0C, 0x8A, 0x00, 0x02, 0xCB],
        );

        bridge.dispatch_record(&record);
        bridge.dispatch_record(&record);

        assert_eq!(
            bridge.read_attribute(id::ELECTRICAL_MEASUREMENT, attr::RMS_CURRENT),
            Ok(AttributeValue::Number(3210))
        );
    }

    #[tokio::test]
    async fn test_derived_power_factor_uses_cached_voltage() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_DIN_METER);

        // Current before any voltage: only rms_current is written
        let current = DatapointRecord::new(0x12, DpType::Value, 5000u32.to_be_bytes().to_vec());
        assert_eq!(bridge.dispatch_record(&current), DispatchOutcome::Applied(1));
        assert_eq!(
            bridge.read_attribute(id::ELECTRICAL_MEASUREMENT, attr::APPARENT_POWER),
            Err(ZclStatus::Failure)
        );

        // Voltage 230 V (2300 decivolts) and active power 920 W (9200 * 0.1 W)
        let voltage = DatapointRecord::new(0x14, DpType::Value, 2300u32.to_be_bytes().to_vec());
        bridge.dispatch_record(&voltage);
        let power = DatapointRecord::new(0x13, DpType::Value, 9200u32.to_be_bytes().to_vec());
        bridge.dispatch_record(&power);

        // Second current arrival triggers the derived pair
        assert_eq!(bridge.dispatch_record(&current), DispatchOutcome::Applied(3));
        assert_eq!(
            bridge.read_attribute(id::ELECTRICAL_MEASUREMENT, attr::APPARENT_POWER),
            Ok(AttributeValue::Number(1150)) // 230 V * 5 A
        );
        assert_eq!(
            bridge.read_attribute(id::ELECTRICAL_MEASUREMENT, attr::POWER_FACTOR),
            Ok(AttributeValue::Number(80)) // 920 W / 1150 VA
        );
    }

    #[tokio::test]
    async fn test_malformed_tail_keeps_decoded_prefix() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_THERMOSTAT);

        // Valid temperature record followed by a record that overruns
        let mut payload = vec![0x00, 0x05];
        payload.extend(DatapointRecord::new(0x69, DpType::Value, vec![0, 0, 0, 0xB3]).encode());
        payload.extend([0x10, 0x02, 0x00, 0x04, 0x00]); // declares 4, carries 1

        let frame = TuyaFrame::decode(TuyaCommand::DataReport, &payload).unwrap();
        bridge.handle_frame(&frame).await;

        assert_eq!(
            bridge.read_attribute(id::THERMOSTAT, attr::LOCAL_TEMPERATURE),
            Ok(AttributeValue::Number(1790))
        );

        // A later well-formed frame still dispatches
        let wire = [0x09, 0x56, 0x02, 0x00, 0x21, 0x6C, 0x01, 0x00, 0x01, 0x01];
        bridge.handle_zcl(&wire).await;
        assert_eq!(
            bridge.read_attribute(id::THERMOSTAT, attr::FROST_LOCK),
            Ok(AttributeValue::Bool(false))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_motion_report_arms_auto_clear() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_MOTION);

        let motion = DatapointRecord::new(0x01, DpType::Bool, vec![0x01]);
        assert_eq!(bridge.dispatch_record(&motion), DispatchOutcome::Applied(2));
        assert_eq!(
            bridge.read_attribute(id::OCCUPANCY_SENSING, attr::OCCUPANCY),
            Ok(AttributeValue::Number(1))
        );
        assert_eq!(
            bridge.read_attribute(id::IAS_ZONE, attr::ZONE_STATUS),
            Ok(AttributeValue::Number(1))
        );

        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert_eq!(
            bridge.read_attribute(id::OCCUPANCY_SENSING, attr::OCCUPANCY),
            Ok(AttributeValue::Number(0))
        );
        // Fan-out partner is not cleared by the timer
        assert_eq!(
            bridge.read_attribute(id::IAS_ZONE, attr::ZONE_STATUS),
            Ok(AttributeValue::Number(1))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_motion_retrigger_extends_window() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_MOTION);
        let motion = DatapointRecord::new(0x01, DpType::Bool, vec![0x01]);

        bridge.dispatch_record(&motion);
        tokio::time::sleep(Duration::from_secs(45)).await;
        bridge.dispatch_record(&motion);
        tokio::time::sleep(Duration::from_secs(45)).await;
        tokio::task::yield_now().await;

        // 90 s after first motion, 45 s after the retrigger: still occupied
        assert_eq!(
            bridge.read_attribute(id::OCCUPANCY_SENSING, attr::OCCUPANCY),
            Ok(AttributeValue::Number(1))
        );

        tokio::time::sleep(Duration::from_secs(16)).await;
        tokio::task::yield_now().await;
        assert_eq!(
            bridge.read_attribute(id::OCCUPANCY_SENSING, attr::OCCUPANCY),
            Ok(AttributeValue::Number(0))
        );
    }

    #[tokio::test]
    async fn test_toggle_reads_cached_state() {
        let (bridge, mut rx) = DpBridge::new(&models::TS0601_VALVE);
        let bridge = Arc::new(bridge);

        // Cached state: on
        bridge.dispatch_record(&DatapointRecord::new(0x01, DpType::Bool, vec![0x01]));

        let toggler = bridge.clone();
        let toggle = tokio::spawn(async move { toggler.invoke_on_off(OnOffCommand::Toggle).await });

        let frame = rx.recv().await.unwrap();
        let sent = ZclFrame::parse(&frame.payload)
            .unwrap()
            .to_tuya_frame()
            .unwrap();
        // Toggle from on -> off
        assert_eq!(sent.datapoints[0].payload, vec![0x00]);

        let response = TuyaFrame {
            command: TuyaCommand::DataResponse,
            seq: sent.seq,
            datapoints: Vec::new(),
        };
        bridge.handle_frame(&response).await;
        assert_eq!(toggle.await.unwrap(), ZclStatus::Success);
    }

    #[tokio::test]
    async fn test_sequence_increments_per_frame() {
        let (bridge, mut rx) = DpBridge::new(&models::TS0601_COVER);
        let bridge = Arc::new(bridge);

        for expected_seq in 1..=3u16 {
            let writer = bridge.clone();
            let write = tokio::spawn(async move {
                writer
                    .write_attribute(
                        id::WINDOW_COVERING,
                        attr::CURRENT_POSITION_LIFT_PERCENTAGE,
                        AttributeValue::Number(40),
                    )
                    .await
            });

            let frame = rx.recv().await.unwrap();
            let sent = ZclFrame::parse(&frame.payload)
                .unwrap()
                .to_tuya_frame()
                .unwrap();
            assert_eq!(sent.seq, expected_seq);
            // Outbound position is inverted: 100 - 40
            assert_eq!(sent.datapoints[0].payload, vec![0x00, 0x00, 0x00, 0x3C]);

            let response = TuyaFrame {
                command: TuyaCommand::DataResponse,
                seq: sent.seq,
                datapoints: Vec::new(),
            };
            bridge.handle_frame(&response).await;
            assert_eq!(write.await.unwrap(), ZclStatus::Success);
        }
    }

    #[tokio::test]
    async fn test_unmatched_response_seq_is_tolerated() {
        let (bridge, _rx) = DpBridge::new(&models::TS0601_THERMOSTAT);

        // A response that matches no pending request still dispatches its
        // datapoints
        let response = TuyaFrame {
            command: TuyaCommand::DataResponse,
            seq: 0x4242,
            datapoints: vec![DatapointRecord::new(
                0x69,
                DpType::Value,
                vec![0, 0, 0, 0xC8],
            )],
        };
        bridge.handle_frame(&response).await;

        assert_eq!(
            bridge.read_attribute(id::THERMOSTAT, attr::LOCAL_TEMPERATURE),
            Ok(AttributeValue::Number(2000))
        );
    }
}
