//! Description of a single child-process invocation.

use crate::config::ExternalConfig;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// What to run and how long it may take.
///
/// Built before [`execute`](super::execute) is called and only borrowed by it,
/// so the description cannot change while the child is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub executable: PathBuf,
    /// Passed to the child verbatim, in order.
    pub args: Vec<OsString>,
    /// Wall-clock budget for the whole invocation, measured from entry.
    pub deadline: Duration,
}

impl CommandSpec {
    pub fn new(executable: impl Into<PathBuf>, deadline: Duration) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            deadline,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The `[external]` section of the config as a runnable spec.
    pub fn from_config(config: &ExternalConfig) -> Self {
        Self::new(&config.executable, config.deadline()).args(&config.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_argument_order() {
        let spec = CommandSpec::new("/usr/bin/convert", Duration::from_secs(3))
            .arg("-")
            .args(["-resize", "50%"])
            .arg("-");

        assert_eq!(spec.executable, PathBuf::from("/usr/bin/convert"));
        assert_eq!(spec.args, vec!["-", "-resize", "50%", "-"]);
        assert_eq!(spec.deadline, Duration::from_secs(3));
    }

    #[test]
    fn from_config_uses_stock_convert_invocation() {
        let spec = CommandSpec::from_config(&ExternalConfig::default());

        assert_eq!(spec.executable, PathBuf::from("/usr/bin/convert"));
        assert_eq!(spec.args, vec!["-", "-resize", "50%", "-"]);
        assert_eq!(spec.deadline, Duration::from_secs(10));
    }
}
