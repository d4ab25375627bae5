use crate::{ObserverSink, PipelineError};
use async_trait::async_trait;
use domain::ObserverPacket;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// MQTT Sink 配置。
#[derive(Debug, Clone)]
pub struct MqttSinkConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
    pub qos: u8,
}

/// 发布负载：`{"uid", "events", "replay"}`，replay 为小写十六进制。
#[derive(Debug, Serialize)]
pub struct SinkEnvelope<'a> {
    pub uid: Option<&'a str>,
    pub events: &'a [ObserverPacket],
    pub replay: String,
}

impl<'a> SinkEnvelope<'a> {
    pub fn new(events: &'a [ObserverPacket], replay: &[u8]) -> Self {
        Self {
            uid: events.iter().find_map(|event| event.uid.as_deref()),
            events,
            replay: hex::encode(replay),
        }
    }
}

/// MQTT 投递实现。
#[derive(Clone)]
pub struct MqttSink {
    client: AsyncClient,
    topic_prefix: String,
    qos: QoS,
}

impl MqttSink {
    pub fn connect(
        config: MqttSinkConfig,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), PipelineError> {
        let client_id = format!("trk-gateway-sink-{}", uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (config.username, config.password) {
            options.set_credentials(username, password);
        }
        let (client, mut eventloop) = AsyncClient::new(options, 64);
        let handle = tokio::spawn(async move {
            loop {
                if let Err(err) = eventloop.poll().await {
                    warn!(target: "trk.pipeline", "mqtt sink eventloop error: {}", err);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        });
        Ok((
            Self {
                client,
                topic_prefix: config.topic_prefix,
                qos: qos_from_u8(config.qos),
            },
            handle,
        ))
    }

    pub fn topic_for(&self, uid: Option<&str>) -> String {
        topic_for(&self.topic_prefix, uid)
    }
}

fn topic_for(prefix: &str, uid: Option<&str>) -> String {
    let prefix = prefix.trim_end_matches('/');
    format!("{}/{}", prefix, uid.unwrap_or("unknown"))
}

#[async_trait]
impl ObserverSink for MqttSink {
    async fn store(&self, events: &[ObserverPacket], replay: &[u8]) -> Result<(), PipelineError> {
        let envelope = SinkEnvelope::new(events, replay);
        let topic = self.topic_for(envelope.uid);
        let payload =
            serde_json::to_vec(&envelope).map_err(|err| PipelineError::Payload(err.to_string()))?;
        info!(
            target: "trk.pipeline",
            topic = %topic,
            events = events.len(),
            payload_size = payload.len(),
            "sink_publish"
        );
        self.client
            .publish(topic, self.qos, false, payload)
            .await
            .map_err(|err| PipelineError::Sink(err.to_string()))
    }
}

fn qos_from_u8(value: u8) -> QoS {
    match value {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Sensors;

    fn event(uid: Option<&str>) -> ObserverPacket {
        ObserverPacket {
            uid: uid.map(str::to_string),
            time: "2013-07-09T08:15:27.000000".to_string(),
            latitude: 1.0,
            longitude: 2.0,
            altitude: None,
            speed: 0.0,
            course: 0.0,
            sensors: Sensors::new(),
        }
    }

    #[test]
    fn envelope_carries_uid_and_hex_replay() {
        let events = vec![event(Some("868204000728070"))];
        let envelope = SinkEnvelope::new(&events, &[0x12, 0x00, 0xff]);
        let json = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(json["uid"], "868204000728070");
        assert_eq!(json["replay"], "1200ff");
        assert_eq!(json["events"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn orphan_events_go_to_unknown_topic() {
        let events = vec![event(None)];
        let envelope = SinkEnvelope::new(&events, &[]);
        assert!(envelope.uid.is_none());
        assert_eq!(topic_for("trk/events/", envelope.uid), "trk/events/unknown");
        assert_eq!(topic_for("trk/events", Some("42")), "trk/events/42");
    }
}
