//! Keeps only node readiness transitions.

use crate::event::{Event, Level};
use crate::filter::{Filter, FilterError, Verdict};

const NODE_NOT_READY: &str = "NodeNotReady";
const NODE_READY: &str = "NodeReady";

pub struct NodeEventsChecker;

impl Filter for NodeEventsChecker {
    fn name(&self) -> &str {
        "node-events-checker"
    }

    fn describe(&self) -> &str {
        "Sends notifications on node level critical events."
    }

    fn apply(&self, event: &mut Event) -> Result<Verdict, FilterError> {
        if event.object_kind != "Node" {
            return Ok(Verdict::Pass);
        }
        let Some(reason) = event.reason.as_deref() else {
            return Ok(Verdict::Pass);
        };

        match reason {
            NODE_NOT_READY => event.annotations.level = Level::Critical,
            NODE_READY => event.annotations.level = Level::Info,
            other => {
                return Ok(Verdict::Veto(format!("node event reason '{other}' is not tracked")));
            }
        }
        Ok(Verdict::Pass)
    }
}
