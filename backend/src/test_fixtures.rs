//! Shared rstest fixtures for the backend unit tests.
