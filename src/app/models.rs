use chrono::{Local, TimeZone};
use derivative::Derivative;

// A single to-do record. `id` is assigned by storage on insert;
// `created_at` is unix seconds and stays None for rows whose creation
// time was never recorded (pre-migration data).
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub done: bool,
    pub created_at: Option<i64>,
}

impl Task {
    // A task as entered by the user, not yet persisted.
    pub fn new(title: String, description: String, done: bool) -> Task {
        Task {
            id: None,
            title,
            description,
            done,
            created_at: None,
        }
    }

    // Creation date as "dd.mm.yyyy HH:MM", or empty when unknown.
    pub fn formatted_created_at(&self) -> String {
        match self.created_at.filter(|&secs| secs > 0) {
            Some(secs) => match Local.timestamp_opt(secs, 0).single() {
                Some(date) => date.format("%d.%m.%Y %H:%M").to_string(),
                None => String::new(),
            },
            None => String::new(),
        }
    }
}

// The list screen's filter/sort state, passed into Storage::get_tasks.
// Changing a filter produces a new value; the screen replaces its copy and
// re-queries, so there is no mutable query state scattered across fields.
#[derive(Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct TaskView {
    pub search: Option<String>,
    pub completed_first: bool,
    #[derivative(Default(value = "true"))]
    pub newest_first: bool,
}

impl TaskView {
    pub fn with_search(&self, search: Option<String>) -> TaskView {
        TaskView {
            search: search.filter(|s| !s.trim().is_empty()),
            ..self.clone()
        }
    }

    pub fn toggled_completed_first(&self) -> TaskView {
        TaskView {
            completed_first: !self.completed_first,
            ..self.clone()
        }
    }

    pub fn toggled_newest_first(&self) -> TaskView {
        TaskView {
            newest_first: !self.newest_first,
            ..self.clone()
        }
    }
}
