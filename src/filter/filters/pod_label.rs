//! Recommends labels on newly created pods.

use crate::event::Event;
use crate::filter::{Filter, FilterError, Verdict};

pub struct PodLabelChecker;

impl Filter for PodLabelChecker {
    fn name(&self) -> &str {
        "pod-label-checker"
    }

    fn describe(&self) -> &str {
        "Checks and adds recommendations if labels are missing in the pod specs."
    }

    fn apply(&self, event: &mut Event) -> Result<Verdict, FilterError> {
        if event.is_creation_of("Pod") && event.label_count() == 0 {
            let recommendation = format!(
                "pod '{}' creation without labels should be avoided.",
                event.name
            );
            event.annotations.recommendations.push(recommendation);
        }
        Ok(Verdict::Pass)
    }
}
