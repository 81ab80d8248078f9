use std::sync::Arc;

use crate::{config::AppConfig, db::OrmConn, gateway::PaymentGateway};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub gateway: Arc<dyn PaymentGateway>,
    pub client_url: String,
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(orm: OrmConn, gateway: Arc<dyn PaymentGateway>, config: &AppConfig) -> Self {
        Self {
            orm,
            gateway,
            client_url: config.client_url.clone(),
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}
