use crate::advisor::BidAdvisor;
use crate::database::DatabaseManager;
use crate::message_broker::KafkaProducer;
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub producer: Arc<KafkaProducer>,
    pub advisor: Arc<BidAdvisor>,
}
