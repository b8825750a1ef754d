//! Delivery of communications to messaging destinations
//!
//! The engine never talks to a messaging provider directly. Callers supply a
//! [`NotificationSink`]; the audit itself stays pure.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Communication;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid destination number: {0}")]
    InvalidDestination(String),

    #[error("Delivery to {destination} failed: {reason}")]
    Delivery { destination: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mobile number in international format: country 54, mobile prefix 9.
static DESTINATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^549\d{8,11}$").expect("Invalid destination regex pattern"));

/// Validated messaging destination, digits only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination(String);

impl Destination {
    /// Accepts formatted input ("+54 9 11 1234-5678"); separators are dropped.
    pub fn parse(raw: &str) -> Result<Self, DispatchError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if DESTINATION_RE.is_match(&digits) {
            Ok(Self(digits))
        } else {
            Err(DispatchError::InvalidDestination(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{}", self.0)
    }
}

/// Acknowledgement returned by a sink for one delivered message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub destination: Destination,
    pub sector: String,
    pub delivered_at: DateTime<Utc>,
    /// Provider-side message identifier, when the sink has one.
    pub reference: Option<String>,
}

/// Transport for ready-to-send communications.
pub trait NotificationSink {
    fn deliver(
        &self,
        communication: &Communication,
        destination: &Destination,
    ) -> Result<DeliveryReceipt, DispatchError>;
}

/// Writes each message to stdout. Used by the CLI in place of a provider.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn deliver(
        &self,
        communication: &Communication,
        destination: &Destination,
    ) -> Result<DeliveryReceipt, DispatchError> {
        use std::io::Write;
        let mut out = std::io::stdout().lock();
        writeln!(out, "--- para {} ---", destination)?;
        writeln!(out, "{}", communication.body)?;
        writeln!(out)?;
        Ok(DeliveryReceipt {
            destination: destination.clone(),
            sector: communication.sector.as_str().to_string(),
            delivered_at: Utc::now(),
            reference: None,
        })
    }
}

/// Outcome of sending a batch: receipts for what went out, errors for the rest.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub receipts: Vec<DeliveryReceipt>,
    pub failures: Vec<DispatchError>,
}

/// Send every communication to one destination. A failed delivery does not
/// stop the rest.
pub fn dispatch_all(
    sink: &dyn NotificationSink,
    communications: &[Communication],
    destination: &Destination,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    for communication in communications {
        match sink.deliver(communication, destination) {
            Ok(receipt) => report.receipts.push(receipt),
            Err(e) => {
                tracing::warn!(
                    sector = communication.sector.as_str(),
                    error = %e,
                    "Delivery failed"
                );
                report.failures.push(e);
            }
        }
    }
    tracing::info!(
        delivered = report.receipts.len(),
        failed = report.failures.len(),
        "Dispatch complete"
    );
    report
}
