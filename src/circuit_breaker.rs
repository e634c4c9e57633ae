use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Circuit breaker guarding Earth Engine raster queries.
pub type ProviderCircuitBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Creates the circuit breaker for remote soil queries.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failed queries trigger OPEN state.
/// - **Backoff**: Exponential backoff from 30s to 300s before a trial query.
///
/// # States
///
/// - **CLOSED**: Queries go to Earth Engine.
/// - **OPEN**: Queries are skipped and the synthetic model answers alone.
/// - **HALF_OPEN**: One query is let through to test recovery.
///
/// Authentication is cached separately; opening the breaker never discards
/// the session.
pub fn create_provider_circuit_breaker() -> ProviderCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(30),  // Initial delay
        Duration::from_secs(300), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}
