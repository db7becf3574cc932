use std::collections::VecDeque;

use crate::geometry::CPos;
use crate::scripting::ScriptCallback;

#[derive(Debug)]
pub enum Activity {
    /// Walk one cell per tick until `destination` is reached.
    Move { destination: CPos },
    Wait { remaining: u32 },
    CallScript(ScriptCallback),
    /// Leave the world and dispose the actor.
    RemoveSelf,
}

/// Per-actor activity queue. Dropping or cancelling it releases any queued script callbacks.
#[derive(Debug, Default)]
pub struct ActivityQueue {
    activities: VecDeque<Activity>,
}

impl ActivityQueue {
    pub fn push(&mut self, activity: Activity) {
        self.activities.push_back(activity);
    }

    pub fn front_mut(&mut self) -> Option<&mut Activity> {
        self.activities.front_mut()
    }

    pub fn pop(&mut self) -> Option<Activity> {
        self.activities.pop_front()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn cancel(&mut self) {
        for activity in &mut self.activities {
            if let Activity::CallScript(callback) = activity {
                callback.cancel();
            }
        }
        self.activities.clear();
    }
}
