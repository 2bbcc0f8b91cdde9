//! Courier Module
//!
//! A courier is an immutable registry entry: a display name, the transport
//! method used to deliver its batches, the credentials for that method and an
//! injected consignment-number generator.

mod generator;

pub use generator::{NumberGenerator, country_suffixed, date_prefixed, fixed_sequence, from_format};

use crate::clock::Clock;
use crate::config::CourierConfig;
use crate::error::{DispatchError, Result};
use crate::types::{TransportCredentials, TransportMethod};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Courier {
    name: String,
    transport_method: TransportMethod,
    transport_credentials: TransportCredentials,
    number_generator: NumberGenerator,
}

impl Courier {
    pub fn new(
        name: impl Into<String>,
        transport_method: TransportMethod,
        transport_credentials: TransportCredentials,
        number_generator: NumberGenerator,
    ) -> Self {
        Self {
            name: name.into(),
            transport_method,
            transport_credentials,
            number_generator,
        }
    }

    /// Build a courier from its configuration entry
    ///
    /// Date-prefixed formats read the date from `clock` on every allocation.
    pub fn from_config(config: &CourierConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.name.clone(),
            config.transport_method.clone(),
            config.credentials.clone(),
            from_format(&config.number_format, clock),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport_method(&self) -> &TransportMethod {
        &self.transport_method
    }

    pub fn transport_credentials(&self) -> &TransportCredentials {
        &self.transport_credentials
    }

    pub fn credential(&self, key: &str) -> Option<&str> {
        self.transport_credentials.get(key).map(String::as_str)
    }

    /// Allocate a number by calling the generator exactly once
    pub fn next_consignment_number(&self) -> String {
        (self.number_generator)()
    }

    /// Allocate a number that is not in `used`
    ///
    /// The generator is re-invoked only while the candidate collides. After
    /// `max_attempts` candidates without a fresh value this gives up with
    /// [`DispatchError::GenerationExhausted`].
    pub fn next_unique_number(&self, used: &HashSet<String>, max_attempts: usize) -> Result<String> {
        for _ in 0..max_attempts {
            let candidate = self.next_consignment_number();
            if !used.contains(&candidate) {
                return Ok(candidate);
            }
            tracing::debug!(courier = %self.name, candidate = %candidate, "Consignment number collision");
        }

        Err(DispatchError::GenerationExhausted {
            courier: self.name.clone(),
            attempts: max_attempts,
        })
    }
}

impl fmt::Debug for Courier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // credentials may hold passwords
        f.debug_struct("Courier")
            .field("name", &self.name)
            .field("transport_method", &self.transport_method)
            .field("credential_keys", &self.transport_credentials.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_creds() -> TransportCredentials {
        TransportCredentials::from([
            ("to".to_string(), "some-email@somedomain.com".to_string()),
            ("from".to_string(), "no-reply@somedomain.com".to_string()),
        ])
    }

    #[test]
    fn test_accessors() {
        let courier = Courier::new(
            "Royal Mail",
            TransportMethod::Email,
            email_creds(),
            fixed_sequence(["1111111111-GB"]),
        );

        assert_eq!(courier.name(), "Royal Mail");
        assert_eq!(courier.transport_method(), &TransportMethod::Email);
        assert_eq!(courier.transport_credentials(), &email_creds());
        assert_eq!(courier.credential("to"), Some("some-email@somedomain.com"));
        assert_eq!(courier.credential("server"), None);
    }

    #[test]
    fn test_next_number_calls_generator_once() {
        let courier = Courier::new(
            "ANC",
            TransportMethod::Ftp,
            TransportCredentials::new(),
            fixed_sequence(["A", "B", "C"]),
        );

        assert_eq!(courier.next_consignment_number(), "A");
        assert_eq!(courier.next_consignment_number(), "B");
    }

    #[test]
    fn test_unique_number_skips_used_values() {
        let courier = Courier::new(
            "ANC",
            TransportMethod::Ftp,
            TransportCredentials::new(),
            fixed_sequence(["A", "B", "C"]),
        );
        let used: HashSet<String> = ["A".to_string(), "B".to_string()].into();

        assert_eq!(courier.next_unique_number(&used, 10).unwrap(), "C");
    }

    #[test]
    fn test_unique_number_gives_up_after_max_attempts() {
        let courier = Courier::new(
            "Royal Mail",
            TransportMethod::Email,
            TransportCredentials::new(),
            fixed_sequence(["1111111111-GB"]),
        );
        let used: HashSet<String> = ["1111111111-GB".to_string()].into();

        let err = courier.next_unique_number(&used, 3).unwrap_err();
        assert_eq!(
            err,
            DispatchError::GenerationExhausted { courier: "Royal Mail".into(), attempts: 3 }
        );
    }

    #[test]
    fn test_debug_hides_credential_values() {
        let courier = Courier::new(
            "ANC",
            TransportMethod::Ftp,
            TransportCredentials::from([("password".to_string(), "hunter2".to_string())]),
            fixed_sequence(["1"]),
        );

        let debug = format!("{:?}", courier);
        assert!(debug.contains("password"));
        assert!(!debug.contains("hunter2"));
    }
}
