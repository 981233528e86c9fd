//! MQTT client for receiving Frigate object events
//!
//! Startup is strict: the first connection attempt must be accepted and the
//! `frigate/events` subscription acknowledged, otherwise a `TransportError`
//! is returned and the process exits. Once running, broker errors are logged
//! and the eventloop reconnects, re-subscribing on every ConnAck.
//!
//! Messages are run through the pipeline inside the receive loop, one at a
//! time. Composed notifications go to the notify queue with `try_send`, so a
//! slow ntfy server never stalls the eventloop.

use crate::domain::notification::NotificationPayload;
use crate::infra::config::Config;
use crate::services::notify_worker::{EnqueueError, NotifySender};
use crate::services::pipeline::Pipeline;
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
    SubscribeReasonCode,
};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to MQTT broker {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: ConnectionError,
    },
    #[error("failed to subscribe to {topic}: {reason}")]
    Subscribe { topic: String, reason: String },
}

/// Build client options from config
pub fn mqtt_options(config: &Config) -> MqttOptions {
    let mut mqttoptions =
        MqttOptions::new(config.mqtt_client_id(), config.mqtt_host(), config.mqtt_port());
    mqttoptions.set_keep_alive(KEEP_ALIVE);

    // Password may be empty; username alone enables auth
    if let Some(username) = config.mqtt_username() {
        mqttoptions.set_credentials(username, config.mqtt_password().unwrap_or_default());
    }

    mqttoptions
}

/// Status message for a refused or failed broker connection
fn connect_failed_status(e: &ConnectionError) -> NotificationPayload {
    let reason = match e {
        ConnectionError::ConnectionRefused(code) => format!("rc={:?}", code),
        other => other.to_string(),
    };
    NotificationPayload::status(format!("Connection to MQTT Broker failed ({})", reason))
}

fn connected_status() -> NotificationPayload {
    NotificationPayload::status("Connected to MQTT Broker!")
}

/// Status messages are best effort; a full or closed queue only gets a debug line
fn enqueue_status(notify: &NotifySender, payload: NotificationPayload) {
    let body = payload.body.clone();
    if let Err(e) = notify.enqueue(payload) {
        debug!(reason = ?e, body = %body, "status_notification_dropped");
    }
}

/// A connected, subscribed client ready to receive events
pub struct EventSubscriber {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
}

impl EventSubscriber {
    /// Connect and subscribe, waiting for the broker to acknowledge both
    pub async fn connect(config: &Config, notify: &NotifySender) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", config.mqtt_host(), config.mqtt_port());
        let (client, mut eventloop) = AsyncClient::new(mqtt_options(config), 100);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => break,
                Ok(_) => {}
                Err(source) => {
                    enqueue_status(notify, connect_failed_status(&source));
                    return Err(TransportError::Connect { addr, source });
                }
            }
        }

        info!(addr = %addr, client_id = %config.mqtt_client_id(), "mqtt_connected");
        enqueue_status(notify, connected_status());

        let topic = config.mqtt_topic().to_string();
        let subscribe_err = |reason: String| TransportError::Subscribe { topic: topic.clone(), reason };

        client
            .subscribe(topic.as_str(), QoS::AtMostOnce)
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::SubAck(suback))) => {
                    if suback.return_codes.iter().any(|c| matches!(c, SubscribeReasonCode::Failure)) {
                        return Err(subscribe_err("broker rejected subscription".to_string()));
                    }
                    break;
                }
                Ok(_) => {}
                Err(e) => return Err(subscribe_err(e.to_string())),
            }
        }

        info!(topic = %topic, "mqtt_subscribed");
        Ok(Self { client, eventloop, topic })
    }

    /// Receive loop. Runs until shutdown or until the notify queue closes.
    pub async fn run(
        mut self,
        pipeline: &mut Pipeline,
        notify: &NotifySender,
        mut shutdown: watch::Receiver<bool>,
    ) {
        // Rate-limit drop warnings to 1 per second
        let mut last_drop_warn = Instant::now() - Duration::from_secs(2);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("mqtt_shutdown");
                        let _ = self.client.disconnect().await;
                        return;
                    }
                }
                result = self.eventloop.poll() => {
                    match result {
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            if publish.topic != self.topic {
                                debug!(topic = %publish.topic, "mqtt_unexpected_topic");
                                continue;
                            }

                            let Some(payload) = pipeline.process_message(&publish.payload, Instant::now()) else {
                                continue;
                            };

                            match notify.enqueue(payload) {
                                Ok(()) => {}
                                Err(EnqueueError::Full) => {
                                    if last_drop_warn.elapsed() > Duration::from_secs(1) {
                                        warn!("notification_dropped: queue full");
                                        last_drop_warn = Instant::now();
                                    }
                                }
                                Err(EnqueueError::Closed) => {
                                    warn!("Notification queue closed");
                                    return;
                                }
                            }
                        }
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("mqtt_reconnected");
                            // Clean session: the broker forgot our subscription
                            if let Err(e) = self.client.try_subscribe(self.topic.as_str(), QoS::AtMostOnce) {
                                error!(error = %e, "mqtt_resubscribe_failed");
                            }
                            enqueue_status(notify, connected_status());
                        }
                        Ok(Event::Incoming(Packet::SubAck(suback))) => {
                            debug!(return_codes = ?suback.return_codes, "mqtt_suback");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "MQTT error");
                            if matches!(e, ConnectionError::ConnectionRefused(_)) {
                                enqueue_status(notify, connect_failed_status(&e));
                            }
                            tokio::time::sleep(RECONNECT_DELAY).await;
                        }
                    }
                }
            }
        }
    }
}

/// Connect, subscribe and run the receive loop until shutdown
pub async fn start_mqtt_client(
    config: &Config,
    pipeline: &mut Pipeline,
    notify: &NotifySender,
    shutdown: watch::Receiver<bool>,
) -> Result<(), TransportError> {
    let subscriber = EventSubscriber::connect(config, notify).await?;
    subscriber.run(pipeline, notify, shutdown).await;
    Ok(())
}
