//! Public API for the producer adapter

pub use crate::producer::adapter::{
    ProducerAdapter, ProducerResponse, DEFAULT_ATTRIBUTE_FIELDS, FAILURE_BODY, SUCCESS_BODY,
};
