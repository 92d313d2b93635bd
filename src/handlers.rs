use std::sync::Arc;

use log::trace;

use crate::config::{BridgeConfig, ErrorMode};
use crate::error::{BridgeError, Result};
use crate::registrar::{HostNamespace, Registrar};
use crate::value::{HostValue, ValueKind};

pub const PROCESS_DATA: &str = "processData";
pub const PROCESSED_PREFIX: &str = "Processed: ";

/// The actual work behind `processData`. Lives outside the bridge.
pub trait Processor: Send + Sync {
    fn process(&self, input: &str) -> String;
}

/// Placeholder processing: prefix the input, nothing else.
#[derive(Debug, Clone)]
pub struct PrefixProcessor {
    prefix: String,
}

impl Default for PrefixProcessor {
    fn default() -> Self {
        Self {
            prefix: PROCESSED_PREFIX.to_string(),
        }
    }
}

impl Processor for PrefixProcessor {
    fn process(&self, input: &str) -> String {
        format!("{}{input}", self.prefix)
    }
}

/// The first argument as a string. Anything past it is ignored.
pub fn first_string(args: &[HostValue]) -> Result<&str> {
    let first = args.first().ok_or(BridgeError::MissingInput)?;
    first.as_str().ok_or(BridgeError::TypeMismatch {
        expected: ValueKind::String,
        found: first.kind(),
    })
}

pub fn process_data(
    processor: &dyn Processor,
    mode: ErrorMode,
    args: &[HostValue],
) -> Result<HostValue> {
    trace!("{PROCESS_DATA} called with {} argument(s)", args.len());
    match first_string(args) {
        Ok(input) => Ok(HostValue::String(processor.process(input))),
        Err(e @ BridgeError::MissingInput) if mode == ErrorMode::Legacy => {
            Ok(HostValue::String(e.legacy_sentinel()))
        }
        Err(e) => Err(e),
    }
}

/// Register everything the module exports.
pub fn register_defaults<N: HostNamespace>(
    registrar: &mut Registrar<N>,
    config: &BridgeConfig,
) -> Result<()> {
    register_process_data(registrar, Arc::new(PrefixProcessor::default()), config.error_mode)
}

pub fn register_process_data<N: HostNamespace>(
    registrar: &mut Registrar<N>,
    processor: Arc<dyn Processor>,
    mode: ErrorMode,
) -> Result<()> {
    registrar.register(PROCESS_DATA, move |args| {
        process_data(processor.as_ref(), mode, args)
    })
}
