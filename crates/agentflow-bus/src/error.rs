use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("no subscribers for task `{0}`")]
    NoSubscribers(String),
}
