//! # Call Dispatcher
//!
//! One synchronous invocation, start to finish:
//!
//! 1. Acquire the call's shape from the registry.
//! 2. Encode every input, in declaration order.
//! 3. Invoke through the endpoint pool, retrying transient failures.
//! 4. Decode the reply into the outputs, position by position.
//! 5. On any failure, reset every output.
//!
//! Callers only learn success or failure. The reason goes to the log.

use std::thread;

use buspack::Value;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::bus::BusError;
use crate::bus::ErrorClass;
use crate::call::CallData;
use crate::call::CallId;
use crate::client::ClientInner;
use crate::error::Error;
use crate::error::Result;
use crate::pool::Policy;

/// Resets a call's outputs on drop unless disarmed.
struct ResetOnFailure<'a> {
    data: &'a CallData,
    armed: bool,
}

impl<'a> ResetOnFailure<'a> {
    fn new(data: &'a CallData) -> Self {
        Self { data, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ResetOnFailure<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.data.reset_outputs();
        }
    }
}

pub(crate) fn call_sync(client: &ClientInner, id: CallId) -> bool {
    let guard = client.registry.acquire(id);
    let Some(data) = guard.data() else {
        return false;
    };

    let mut reset = ResetOnFailure::new(data);
    match invoke(client, data) {
        Ok(()) => {
            reset.disarm();
            debug!("{} {}.{} succeeded", data.id, data.target, data.method);
            true
        }
        Err(e) => {
            error!("{} {}.{} failed: {}", data.id, data.target, data.method, e);
            false
        }
    }
}

pub(crate) fn invoke(client: &ClientInner, data: &CallData) -> Result<()> {
    data.naming.clone().map_err(Error::InvalidTarget)?;
    if client.registry.is_shut_down() {
        return Err(Error::ShutDown);
    }
    let args = encode_inputs(data)?;
    let reply = invoke_with_retry(client, data, &args)?;
    decode_outputs(client, data, &reply)
}

fn encode_inputs(data: &CallData) -> Result<Vec<Value>> {
    data.inputs
        .iter()
        .map(|input| {
            (input.encode)().ok_or_else(|| Error::Marshal {
                param: input.name.clone(),
                signature: input.signature,
            })
        })
        .collect()
}

fn invoke_with_retry(client: &ClientInner, data: &CallData, args: &[Value]) -> Result<Vec<Value>> {
    let retry = client.config.retry;
    let attempts = retry.max_attempts.max(1);
    let mut last: Option<BusError> = None;

    for attempt in 0..attempts {
        match ErrorClass::of(last.as_ref()) {
            ErrorClass::None => {}
            ErrorClass::Retriable => {
                warn!(
                    "{}.{} attempt {} failed, retrying in {:?}: {}",
                    data.target,
                    data.method,
                    attempt,
                    retry.backoff,
                    last.as_ref().map(ToString::to_string).unwrap_or_default()
                );
                thread::sleep(retry.backoff);
            }
            ErrorClass::Fatal => break,
        }

        // first attempt reuses the cached proxy, retries get a fresh one
        let policy = if attempt == 0 { Policy::UseExisting } else { Policy::Recreate };
        let endpoint = client.pool.for_target(&data.target, policy);
        if !endpoint.is_valid() {
            return Err(Error::InvalidEndpoint(data.target.clone()));
        }

        match endpoint.invoke(&data.method, args) {
            Ok(reply) => return Ok(reply),
            Err(e) => last = Some(e),
        }
    }

    let last = last.unwrap_or_else(|| BusError::unspecified("no attempt was made"));
    Err(last.into())
}

fn decode_outputs(client: &ClientInner, data: &CallData, reply: &[Value]) -> Result<()> {
    if client.config.strict_outputs && reply.len() > data.outputs.len() {
        return Err(Error::ExtraOutputs {
            expected: data.outputs.len(),
            found: reply.len(),
        });
    }
    for (i, output) in data.outputs.iter().enumerate() {
        let Some(field) = reply.get(i) else {
            return Err(Error::MissingOutput { param: output.name.clone() });
        };
        if !(output.decode)(field, &client.shadow) {
            return Err(Error::Unmarshal {
                param: output.name.clone(),
                signature: output.signature,
            });
        }
    }
    Ok(())
}
