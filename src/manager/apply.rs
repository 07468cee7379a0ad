// src/manager/apply.rs

//! Executes a diff plan against the registry and persists the result

use crate::error::{Error, Result};
use crate::lockfile::Lockfile;
use crate::manager::diff::{Operation, PackageDiff};
use crate::manager::registry::Registry;
use crate::packages::HandlerFactory;
use tracing::{info, warn};

/// Apply `plan` in order, then write the lock record.
///
/// The first failing operation aborts the rest of the plan. Operations that
/// already ran are kept and the lock record is left untouched, so it may lag
/// behind the payloads on disk until the next successful run. An empty plan
/// does nothing at all.
pub fn apply(
    plan: &[PackageDiff],
    registry: &mut Registry,
    factory: &dyn HandlerFactory,
    lock: &Lockfile,
) -> Result<()> {
    if plan.is_empty() {
        info!("Nothing to apply");
        return Ok(());
    }

    let mut removed = Vec::new();
    let outcome = run_plan(plan, registry, factory, &mut removed);

    // Removals that already happened stay applied even when the plan failed
    for name in removed {
        registry.remove(name);
    }
    outcome?;

    lock.dump(&registry.descriptions())
        .map_err(|e| Error::PersistenceFailure(e.to_string()))
}

fn run_plan<'a>(
    plan: &'a [PackageDiff],
    registry: &mut Registry,
    factory: &dyn HandlerFactory,
    removed: &mut Vec<&'a str>,
) -> Result<()> {
    for change in plan {
        let description = &change.description;
        let name = description.full_name.as_str();

        match change.operation {
            Operation::Add => {
                if registry.contains(name) {
                    return Err(Error::ConfigurationError(format!(
                        "Cannot install {}: already installed",
                        name
                    )));
                }
                let mut handler = factory.create(description);
                handler
                    .initialize()
                    .map_err(|e| Error::handler(name, "install", e))?;
                registry.insert(description.clone(), handler)?;
                info!("Installed {}", description);
            }
            Operation::Switch => {
                let entry = registry.get_mut(name).ok_or_else(|| {
                    Error::ConfigurationError(format!("Cannot switch {}: not installed", name))
                })?;
                entry
                    .handler_mut()
                    .switch(&description.version)
                    .map_err(|e| Error::handler(name, "switch", e))?;
                entry.set_version(&description.version);
                info!("Switched {} to {}", name, description.version);
            }
            Operation::Delete => {
                let Some(entry) = registry.get_mut(name) else {
                    warn!("{} is not installed, skipping removal", name);
                    continue;
                };
                entry
                    .handler_mut()
                    .destroy()
                    .map_err(|e| Error::handler(name, "remove", e))?;
                removed.push(name);
                info!("Removed {}", name);
            }
        }
    }

    Ok(())
}
