//! CLI command implementations

pub(crate) mod common;
pub(crate) mod init;
pub(crate) mod ls;
pub(crate) mod report;
pub(crate) mod resolve;
pub(crate) mod run;
pub(crate) mod watch;
#[cfg(test)]
pub(crate) mod test_support;
