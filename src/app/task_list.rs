use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::app::models::{Task, TaskView};
use crate::app::storage::Storage;

// Holds the task sequence exactly as the gateway returned it, plus the
// list-widget selection state. It never re-queries on its own; the owning
// screen calls reload() after anything structural (add, edit, delete,
// filter/sort/search change).
pub struct TaskList<'a> {
    pub state: ListState,
    pub items: Vec<Task>,
    storage: &'a Storage,
}

impl<'a> TaskList<'a> {
    pub fn with_items_from_storage(storage: &'a Storage, view: &TaskView) -> TaskList<'a> {
        TaskList {
            state: ListState::default(),
            items: storage.get_tasks(view),
            storage,
        }
    }

    // Replace the backing sequence wholesale with a fresh query result.
    pub fn reload(&mut self, view: &TaskView) {
        self.items = self.storage.get_tasks(view);
        if self.items.is_empty() {
            self.state.select(None);
        } else if let Some(i) = self.state.selected() {
            self.state.select(Some(i.min(self.items.len() - 1)));
        }
    }

    // Move the selection to the next item, wrapping around.
    pub fn next(&mut self) {
        let i = match self.state.selected() {
            Some(i) => {
                if self.items.is_empty() || i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    // Move the selection to the previous item, wrapping around.
    pub fn previous(&mut self) {
        let i = match self.state.selected() {
            Some(i) => {
                if self.items.is_empty() {
                    0
                } else if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn unselect(&mut self) {
        self.state.select(None);
    }

    pub fn get_selected(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.items.get(i))
    }

    // Flip the selected task's done flag through the gateway. The in-memory
    // task only changes after the row update succeeded, so a failed toggle
    // leaves the checkbox as it was. None when there is nothing selected,
    // otherwise whether the write succeeded.
    pub fn toggle_completed(&mut self) -> Option<bool> {
        let i = self.state.selected()?;
        let task = self.items.get_mut(i)?;
        let Some(id) = task.id else {
            return Some(false);
        };

        if self.storage.update_task_status(id, !task.done) {
            task.done = !task.done;
            Some(true)
        } else {
            Some(false)
        }
    }

    // Delete the selected task's row. The caller reloads on success.
    pub fn delete_selected(&self) -> bool {
        match self.get_selected().and_then(|task| task.id) {
            Some(id) => self.storage.delete_task(id),
            None => true,
        }
    }

    pub fn count_open(&self) -> usize {
        self.items.iter().filter(|task| !task.done).count()
    }

    pub fn count_done(&self) -> usize {
        self.items.iter().filter(|task| task.done).count()
    }
}

// Render one task as a two-line list row: checkbox + title, then creation
// date and description. Done tasks get a struck-through, dimmed title.
pub fn task_row(task: &Task) -> ListItem<'_> {
    let title_style = if task.done {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White)
    };

    let mut lines = vec![Line::from(vec![
        Span::from(if task.done { "[x] " } else { "[ ] " }),
        Span::styled(task.title.as_str(), title_style),
    ])];

    let date = task.formatted_created_at();
    let mut detail = vec![Span::styled(
        format!("    {date}"),
        Style::default().fg(Color::DarkGray),
    )];
    if !task.description.is_empty() {
        detail.push(Span::styled(
            format!("  {}", task.description),
            Style::default().fg(Color::Gray),
        ));
    }
    lines.push(Line::from(detail));

    ListItem::new(lines)
}

pub fn get_list_items_ui(tasks: &[Task]) -> Vec<ListItem<'_>> {
    tasks.iter().map(task_row).collect()
}
