mod broker;

pub use broker::{BrokerErrorResponse, BrokerResponse};
