// region:    --- Imports
use crate::events::{EventPublisher, MarketEvent};
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::sync::Arc;
use tracing::{error, info};

// endregion: --- Imports

/// Topic carrying the domain-event feed
pub const EVENTS_TOPIC: &str = "market-events";

// region:    --- Kafka Producer
#[derive(Clone)]
pub struct KafkaProducer {
    producer: Arc<FutureProducer>,
}

impl KafkaProducer {
    pub fn new(brokers: &str) -> Self {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .expect("Producer creation error");

        KafkaProducer {
            producer: Arc::new(producer),
        }
    }

    pub async fn send_message(&self, topic: &str, key: &str, value: &str) -> Result<(), String> {
        info!(
            "{:<12} --> sending Kafka message: topic={}, key={}",
            "Producer", topic, key
        );
        let record = FutureRecord::to(topic).key(key).payload(value);

        self.producer
            .send(record, std::time::Duration::from_secs(0))
            .await
            .map_err(|(e, _)| format!("Error sending message: {:?}", e))?;

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for KafkaProducer {
    async fn publish(&self, event: &MarketEvent) -> Result<(), String> {
        let payload = serde_json::to_string(event).map_err(|e| e.to_string())?;
        self.send_message(EVENTS_TOPIC, &event.key().to_string(), &payload)
            .await
    }
}

// endregion: --- Kafka Producer

// region:    --- Kafka Manager
pub struct KafkaManager {
    producer: Arc<KafkaProducer>,
    brokers: String,
}

impl Default for KafkaManager {
    fn default() -> Self {
        Self::new()
    }
}

impl KafkaManager {
    pub fn new() -> Self {
        let brokers =
            std::env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string());

        let producer = Arc::new(KafkaProducer::new(&brokers));

        KafkaManager { producer, brokers }
    }

    pub fn get_producer(&self) -> Arc<KafkaProducer> {
        Arc::clone(&self.producer)
    }

    pub async fn create_topic(
        &self,
        topic_name: &str,
        num_partitions: i32,
        replication_factor: i32,
    ) -> Result<(), String> {
        info!(
            "{:<12} --> creating Kafka topic: {}",
            "Manager", topic_name
        );

        let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .create()
            .map_err(|e| format!("AdminClient creation failed: {:?}", e))?;

        let new_topic = NewTopic::new(
            topic_name,
            num_partitions,
            TopicReplication::Fixed(replication_factor),
        );

        match admin_client
            .create_topics(&[new_topic], &AdminOptions::new())
            .await
        {
            Ok(_) => {
                info!(
                    "{:<12} --> Kafka topic created: {}",
                    "Manager", topic_name
                );
                Ok(())
            }
            Err(e) => {
                error!("{:<12} --> Kafka topic creation failed: {:?}", "Manager", e);
                Err(format!("topic creation failed: {:?}", e))
            }
        }
    }
}

// endregion: --- Kafka Manager
