//! Phase and override resolution
//!
//! Decides whether an item is built from source. Precedence, highest first:
//!
//! 1. the item is in the source-override list: always build from source
//! 2. pip-only mode: never build from source
//! 3. the enable flag of the item's phase
//!
//! Phase names match exactly; anything else resolves to "disabled".

use crate::config::{InstallerConfig, OverrideKind, Phase};
use tracing::{debug, warn};

pub struct Resolver<'a> {
    config: &'a InstallerConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a InstallerConfig) -> Self {
        Self { config }
    }

    pub fn should_install_from_source(&self, phase: &str, item: &str) -> bool {
        if self.is_overridden(OverrideKind::Source, item) {
            debug!(phase, item, "Source override forces install from source");
            return true;
        }

        if self.config.only_pip {
            debug!(phase, item, "Pip-only mode, skipping source install");
            return false;
        }

        match Phase::from_name(phase) {
            Some(phase) => self.config.phases.enabled(phase),
            None => {
                warn!(phase, item, "Unknown phase, treating as disabled");
                false
            }
        }
    }

    /// Exact membership of `item` in the pip or source override list
    pub fn is_overridden(&self, kind: OverrideKind, item: &str) -> bool {
        self.config.overrides(kind).contains(item)
    }
}
