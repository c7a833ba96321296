//! Test suites for the bridge bootstrap.

mod support;
