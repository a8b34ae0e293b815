//! Ordered paste-injection fallback chain

use tracing::{debug, info, warn};

use super::privileges::{Privilege, PrivilegeChecker};
use crate::error::InjectionError;

/// Whether a strategy should be tried given the current grants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    Attempt,
    /// Not attempted; the privilege is known to be missing
    Skip(Privilege),
}

/// One way of delivering Command+V to the focused application.
///
/// `inject` must have no side effects when it fails.
pub trait InjectionStrategy {
    fn name(&self) -> &'static str;

    fn required_privilege(&self) -> Privilege;

    fn precondition(&self, privileges: &dyn PrivilegeChecker) -> Precondition;

    fn inject(&self) -> Result<(), InjectionError>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChainReport {
    /// Name of the strategy that delivered the paste
    pub succeeded: Option<&'static str>,
    /// Privileges found missing, in chain order, without repeats
    pub denied: Vec<Privilege>,
    pub failures: Vec<(&'static str, InjectionError)>,
}

impl ChainReport {
    fn note_denied(&mut self, privilege: Privilege) {
        if !self.denied.contains(&privilege) {
            self.denied.push(privilege);
        }
    }
}

pub struct InjectionChain {
    strategies: Vec<Box<dyn InjectionStrategy>>,
}

impl InjectionChain {
    pub fn new(strategies: Vec<Box<dyn InjectionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order; the first success wins.
    pub fn run(&self, privileges: &dyn PrivilegeChecker) -> ChainReport {
        let mut report = ChainReport::default();

        for strategy in &self.strategies {
            if let Precondition::Skip(privilege) = strategy.precondition(privileges) {
                debug!(
                    strategy = strategy.name(),
                    privilege = privilege.display_name(),
                    "Skipping injection strategy"
                );
                report.note_denied(privilege);
                continue;
            }

            match strategy.inject() {
                Ok(()) => {
                    info!(strategy = strategy.name(), "Paste injected");
                    report.succeeded = Some(strategy.name());
                    break;
                }
                Err(InjectionError::PrivilegeDenied(privilege)) => {
                    debug!(
                        strategy = strategy.name(),
                        privilege = privilege.display_name(),
                        "Injection strategy lacks privilege"
                    );
                    report.note_denied(privilege);
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Injection strategy failed");
                    report.failures.push((strategy.name(), e));
                }
            }
        }

        report
    }
}
