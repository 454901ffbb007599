//! Administrative block packing

use tracing::debug;

use super::config::PlannerConfig;
use crate::domain::{AdminBlock, Classification};

/// Outcome of packing admin work into the daily time box
#[derive(Debug, Clone)]
pub struct AdminPacking {
    pub block: AdminBlock,
    /// Admin tasks that did not fit today
    pub deferred: Vec<Classification>,
}

/// Greedily fill the admin block, smallest tasks first
///
/// No backtracking: a task that would overflow the capacity is deferred.
pub fn pack_admin_tasks(mut tasks: Vec<Classification>, config: &PlannerConfig) -> AdminPacking {
    debug!(count = tasks.len(), capacity = config.admin_capacity(), "pack_admin_tasks: called");
    tasks.sort_by(|a, b| a.estimated_days.total_cmp(&b.estimated_days));

    let capacity = config.admin_capacity();
    let mut used = 0u32;
    let mut selected = Vec::new();
    let mut deferred = Vec::new();

    for task in tasks {
        let minutes = task.estimated_minutes();
        if let Some(total) = used.checked_add(minutes).filter(|total| *total <= capacity) {
            used = total;
            selected.push(task);
        } else {
            deferred.push(task);
        }
    }

    debug!(selected = selected.len(), deferred = deferred.len(), used, "pack_admin_tasks: done");
    AdminPacking {
        block: AdminBlock {
            tasks: selected,
            time_allocation_minutes: used,
            scheduled_time: config.admin_window(used),
        },
        deferred,
    }
}
