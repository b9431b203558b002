//! Primes
//!
//! Canned answers a simulated node gives to a query text.
//!
//! ```ignore
//! cluster.node(0).unwrap().prime(when("select * from foo").then(PrimedResult::unavailable(Consistency::One, 1, 0)));
//! ```

use crate::error::{DriverError, NodeError};
use crate::response::{Response, Row};
use crate::statement::{Consistency, WriteType};
use std::str::FromStr;
use std::time::Duration;

/// What a simulated node answers.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimedResult {
    Success(Response),
    Error(NodeError),
}

impl PrimedResult {
    pub fn rows(rows: Vec<Row>) -> Self {
        PrimedResult::Success(Response::with_rows(rows))
    }

    pub fn unavailable(consistency: Consistency, required: u32, alive: u32) -> Self {
        PrimedResult::Error(NodeError::Unavailable {
            consistency,
            required,
            alive,
        })
    }

    pub fn read_timeout(consistency: Consistency, received: u32, block_for: u32, data_present: bool) -> Self {
        PrimedResult::Error(NodeError::ReadTimeout {
            consistency,
            received,
            block_for,
            data_present,
        })
    }

    pub fn write_timeout(consistency: Consistency, received: u32, block_for: u32, write_type: WriteType) -> Self {
        PrimedResult::Error(NodeError::WriteTimeout {
            consistency,
            received,
            block_for,
            write_type,
        })
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        PrimedResult::Error(NodeError::InvalidQuery(message.into()))
    }

    pub fn overloaded(message: impl Into<String>) -> Self {
        PrimedResult::Error(NodeError::Overloaded(message.into()))
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        PrimedResult::Error(NodeError::ServerError(message.into()))
    }
}

fn field<'a>(parts: &[&'a str], index: usize, spec: &str) -> Result<&'a str, DriverError> {
    parts
        .get(index)
        .copied()
        .ok_or_else(|| DriverError::Config(format!("Primed result '{}' is missing field {}", spec, index)))
}

fn number(parts: &[&str], index: usize, spec: &str) -> Result<u32, DriverError> {
    let raw = field(parts, index, spec)?;
    raw.parse()
        .map_err(|_| DriverError::Config(format!("Primed result '{}': '{}' is not a number", spec, raw)))
}

/// Parses the compact form used on the command line:
///
/// - `ok` / `rows:<json rows>`
/// - `unavailable:<cl>:<required>:<alive>`
/// - `read_timeout:<cl>:<received>:<block_for>:<data_present>`
/// - `write_timeout:<cl>:<received>:<block_for>:<write_type>`
/// - `invalid:<msg>`, `syntax:<msg>`, `unauthorized:<msg>`,
///   `overloaded:<msg>`, `server_error:<msg>`
/// - `bootstrapping`
impl FromStr for PrimedResult {
    type Err = DriverError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = spec.split_once(':').unwrap_or((spec, ""));
        let parts: Vec<&str> = rest.split(':').collect();

        let result = match kind.trim().to_lowercase().as_str() {
            "ok" => PrimedResult::Success(Response::empty()),
            "rows" => PrimedResult::rows(serde_json::from_str(rest)?),
            "unavailable" => PrimedResult::unavailable(
                field(&parts, 0, spec)?.parse()?,
                number(&parts, 1, spec)?,
                number(&parts, 2, spec)?,
            ),
            "read_timeout" => PrimedResult::read_timeout(
                field(&parts, 0, spec)?.parse()?,
                number(&parts, 1, spec)?,
                number(&parts, 2, spec)?,
                field(&parts, 3, spec)? == "true",
            ),
            "write_timeout" => PrimedResult::write_timeout(
                field(&parts, 0, spec)?.parse()?,
                number(&parts, 1, spec)?,
                number(&parts, 2, spec)?,
                field(&parts, 3, spec)?.parse()?,
            ),
            // messages may contain ':'
            "invalid" => PrimedResult::invalid(rest),
            "syntax" => PrimedResult::Error(NodeError::SyntaxError(rest.to_string())),
            "unauthorized" => PrimedResult::Error(NodeError::Unauthorized(rest.to_string())),
            "overloaded" => PrimedResult::overloaded(rest),
            "server_error" => PrimedResult::server_error(rest),
            "bootstrapping" => PrimedResult::Error(NodeError::Bootstrapping),
            other => {
                return Err(DriverError::Config(format!("Unknown primed result kind '{}'", other)));
            }
        };
        Ok(result)
    }
}

/// A primed answer bound to a query text.
#[derive(Debug, Clone, PartialEq)]
pub struct Prime {
    pub query: String,
    pub result: PrimedResult,
    pub delay: Option<Duration>,
}

impl Prime {
    /// Delay the answer, e.g. to trigger timeouts or speculative executions.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub struct PrimeBuilder {
    query: String,
}

impl PrimeBuilder {
    pub fn then(self, result: PrimedResult) -> Prime {
        Prime {
            query: self.query,
            result,
            delay: None,
        }
    }
}

pub fn when(query: impl Into<String>) -> PrimeBuilder {
    PrimeBuilder { query: query.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unavailable() {
        let result: PrimedResult = "unavailable:ONE:1:0".parse().unwrap();
        assert_eq!(result, PrimedResult::unavailable(Consistency::One, 1, 0));
    }

    #[test]
    fn test_parse_message_keeps_colons() {
        let result: PrimedResult = "invalid:bad input: near 'from'".parse().unwrap();
        assert_eq!(result, PrimedResult::invalid("bad input: near 'from'"));
    }

    #[test]
    fn test_parse_timeouts_and_rows() {
        assert_eq!(
            "read_timeout:QUORUM:2:2:false".parse::<PrimedResult>().unwrap(),
            PrimedResult::read_timeout(Consistency::Quorum, 2, 2, false)
        );
        assert_eq!(
            "write_timeout:ONE:0:1:BATCH_LOG".parse::<PrimedResult>().unwrap(),
            PrimedResult::write_timeout(Consistency::One, 0, 1, WriteType::BatchLog)
        );

        match "rows:[[1,\"a\"],[2,\"b\"]]".parse::<PrimedResult>().unwrap() {
            PrimedResult::Success(response) => assert_eq!(response.rows.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("explode".parse::<PrimedResult>().is_err());
        assert!("unavailable:ONE:x:0".parse::<PrimedResult>().is_err());
        assert!("unavailable:ONE".parse::<PrimedResult>().is_err());
    }

    #[test]
    fn test_prime_builder() {
        let prime = when("select 1").then(PrimedResult::invalid("nope")).with_delay(Duration::from_millis(5));
        assert_eq!(prime.query, "select 1");
        assert_eq!(prime.delay, Some(Duration::from_millis(5)));
    }
}
