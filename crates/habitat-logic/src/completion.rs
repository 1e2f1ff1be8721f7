//! Module completion: guarantees the mandatory module set.
//!
//! Missing mandatory types are synthesized from their catalog templates and
//! appended after the caller's modules, followed by as many extra sleep
//! quarters as it takes to give every crew member one. Existing modules are
//! never touched or reordered.

use std::collections::HashSet;

use crate::catalog::{ModuleType, MANDATORY_TYPES};
use crate::module::{HabitatConfig, Module, MAX_CREW_SIZE};

/// Return `modules` plus whatever is needed to satisfy the mandatory set.
pub fn complete(modules: &[Module], config: &HabitatConfig) -> Vec<Module> {
    let existing: HashSet<ModuleType> = modules.iter().map(|m| m.module_type).collect();
    let mut completed = modules.to_vec();

    for essential in MANDATORY_TYPES {
        if existing.contains(&essential) {
            continue;
        }
        let id = format!("{}-{}", essential.as_str(), completed.len() + 1);
        if let Some(module) = Module::from_template(id, essential) {
            log::info!("Added missing essential module: {}", essential);
            completed.push(module);
        }
    }

    let mut crew_size = config.crew_size();
    if crew_size > MAX_CREW_SIZE {
        log::warn!(
            "Crew size {} capped at {} for completion",
            crew_size,
            MAX_CREW_SIZE
        );
        crew_size = MAX_CREW_SIZE;
    }
    let mut sleep_count = count_of(&completed, ModuleType::Sleep);
    while (sleep_count as i64) < crew_size {
        sleep_count += 1;
        let Some(module) = Module::from_template(format!("sleep-{sleep_count}"), ModuleType::Sleep)
        else {
            break;
        };
        log::info!("Added sleep quarter for crew member {}", sleep_count);
        completed.push(module);
    }

    completed
}

pub(crate) fn count_of(modules: &[Module], module_type: ModuleType) -> usize {
    modules
        .iter()
        .filter(|m| m.module_type == module_type)
        .count()
}
