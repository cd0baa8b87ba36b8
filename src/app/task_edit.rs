use derivative::Derivative;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::app::models::Task;
use crate::app::storage::Storage;

use super::ui::App;

// State of the add/edit dialog: which task is being edited (None = new),
// the draft field contents and the cursor. Kept out of the list state so
// cancelling leaves the list untouched.
#[derive(Derivative)]
#[derivative(Default)]
pub struct TaskEditDialogState {
    pub dialog_active: bool,
    task_id: Option<i64>,
    title: String,
    description: String,
    done: bool,
    error_message: Option<String>,
    cursor_position: (usize, usize),
}

// Dialog line indices: title, description, done checkbox.
const LINE_TITLE: usize = 0;
const LINE_DESCRIPTION: usize = 1;
const LINE_DONE: usize = 2;

impl TaskEditDialogState {
    // Open the dialog with empty fields for a new task.
    pub fn create_a_new_task(&mut self) {
        *self = TaskEditDialogState {
            dialog_active: true,
            ..TaskEditDialogState::default()
        };
    }

    // Open the dialog prefilled with an existing task.
    pub fn edit_task(&mut self, task: &Task) {
        *self = TaskEditDialogState {
            dialog_active: true,
            task_id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            done: task.done,
            ..TaskEditDialogState::default()
        };
    }

    pub fn close(&mut self) {
        self.dialog_active = false;
    }

    fn line_content(&self, y: usize) -> &str {
        match y {
            LINE_TITLE => &self.title,
            LINE_DESCRIPTION => &self.description,
            _ => "",
        }
    }

    // Move the cursor one line down, clamping the column to the new line.
    pub fn move_cursor_down(&mut self) {
        let (x, y) = self.cursor_position;
        let next_y = (y + 1).min(LINE_DONE);
        self.cursor_position = (x.min(self.line_content(next_y).chars().count()), next_y);
    }

    // Move the cursor one line up, clamping the column to the new line.
    pub fn move_cursor_up(&mut self) {
        let (x, y) = self.cursor_position;
        let next_y = y.saturating_sub(1);
        self.cursor_position = (x.min(self.line_content(next_y).chars().count()), next_y);
    }

    pub fn move_cursor_left(&mut self) {
        let (x, y) = self.cursor_position;
        self.cursor_position = (x.saturating_sub(1), y);
    }

    pub fn move_cursor_right(&mut self) {
        let (x, y) = self.cursor_position;
        self.cursor_position = ((x + 1).min(self.line_content(y).chars().count()), y);
    }

    // Backspace: remove the char before the cursor on the current line.
    pub fn delete_char(&mut self) {
        let (x, y) = self.cursor_position;
        if x == 0 {
            return;
        }
        let field = match y {
            LINE_TITLE => &mut self.title,
            LINE_DESCRIPTION => &mut self.description,
            _ => return,
        };
        if x <= field.chars().count() {
            field.remove(byte_offset(field, x - 1));
            self.move_cursor_left();
        }
    }

    // Type a char into the current line. On the Done line, space flips the
    // checkbox instead of inserting.
    pub fn input(&mut self, to_insert: char) {
        let (x, y) = self.cursor_position;
        match y {
            LINE_TITLE => {
                let at = byte_offset(&self.title, x);
                self.title.insert(at, to_insert);
            }
            LINE_DESCRIPTION => {
                let at = byte_offset(&self.description, x);
                self.description.insert(at, to_insert);
            }
            LINE_DONE => {
                if to_insert == ' ' {
                    self.done = !self.done;
                }
                return;
            }
            _ => return,
        }
        self.move_cursor_right();
    }

    // Validate and persist the draft. Empty title is an inline error and no
    // storage call is made. A storage failure keeps the dialog open with the
    // error shown. Returns true when the task was saved and the dialog
    // closed, so the caller knows to reload the list.
    pub fn save_task(&mut self, storage: &Storage) -> bool {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            self.error_message = Some("Title cannot be empty".to_string());
            return false;
        }

        let task = Task {
            id: self.task_id,
            title,
            description: self.description.trim().to_string(),
            done: self.done,
            created_at: None,
        };

        let saved = match self.task_id {
            Some(_) => storage.update_task(&task),
            None => storage.add_task(&task).is_some(),
        };

        if saved {
            self.error_message = None;
            self.dialog_active = false;
            true
        } else {
            self.error_message = Some("Could not save the task".to_string());
            false
        }
    }
}

// The cursor column counts chars; fields are UTF-8 strings, so every index
// into them goes through this char-to-byte conversion.
fn byte_offset(s: &str, char_col: usize) -> usize {
    s.char_indices()
        .nth(char_col)
        .map_or(s.len(), |(offset, _)| offset)
}

// Returns the dialog text: three input lines, an optional error and the key
// hints. The char under the cursor is shown inverted.
pub fn get_task_edit_ui<'a>(app: &'a App<'a>) -> Vec<Line<'a>> {
    const GRAY_TEXT: Style = Style::new().fg(Color::DarkGray);
    const WHITE_TEXT: Style = Style::new().fg(Color::White);
    const BLACK_ON_WHITE: Style = Style::new().fg(Color::Black).bg(Color::White);

    let state = &app.task_edit_dialog_state;
    let (cursor_x, cursor_y) = state.cursor_position;

    struct InputLine<'s> {
        prefix: &'static str,
        placeholder: &'static str,
        value: &'s str,
    }

    let done_value = if state.done { "[x]" } else { "[ ]" };
    let lines = [
        InputLine {
            prefix: "Title:       ",
            placeholder: "My task name",
            value: &state.title,
        },
        InputLine {
            prefix: "Description: ",
            placeholder: "Optional details",
            value: &state.description,
        },
        InputLine {
            prefix: "Done:        ",
            placeholder: "",
            value: done_value,
        },
    ];

    let mut text = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let mut spans = vec![Span::styled(line.prefix, WHITE_TEXT)];
        let selected = cursor_y == i;

        if i == LINE_DONE {
            // The checkbox is a single toggle, highlighted as a whole.
            spans.push(Span::styled(
                line.value.to_string(),
                if selected { BLACK_ON_WHITE } else { WHITE_TEXT },
            ));
            if selected {
                spans.push(Span::styled("  space - toggle", GRAY_TEXT));
            }
        } else if line.value.is_empty() {
            spans.push(Span::styled(line.placeholder, GRAY_TEXT));
            if selected {
                spans.push(Span::styled(" ", BLACK_ON_WHITE));
            }
        } else if selected {
            let start = byte_offset(line.value, cursor_x);
            spans.push(Span::styled(&line.value[..start], WHITE_TEXT));
            match line.value[start..].chars().next() {
                Some(under_cursor) => {
                    let end = start + under_cursor.len_utf8();
                    spans.push(Span::styled(&line.value[start..end], BLACK_ON_WHITE));
                    spans.push(Span::styled(&line.value[end..], WHITE_TEXT));
                }
                None => spans.push(Span::styled(" ", BLACK_ON_WHITE)),
            }
        } else {
            spans.push(Span::styled(line.value, WHITE_TEXT));
        }

        text.push(Line::from(spans));
    }

    text.push(Line::raw(""));
    if let Some(ref error_message) = state.error_message {
        text.push(Line::from(Span::styled(
            error_message.as_str(),
            Style::new().fg(Color::Red),
        )));
        text.push(Line::raw(""));
    }
    text.push(Line::from(Span::styled(
        "Enter - save, Esc - cancel",
        GRAY_TEXT,
    )));

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::TaskView;

    fn count(storage: &Storage) -> usize {
        storage.get_tasks(&TaskView::default()).len()
    }

    #[test]
    fn empty_title_is_rejected_before_any_storage_call() {
        let storage = Storage::open_in_memory().unwrap();
        let mut state = TaskEditDialogState::default();
        state.create_a_new_task();
        state.input(' ');

        assert!(!state.save_task(&storage));
        assert!(state.dialog_active);
        assert_eq!(count(&storage), 0);
    }

    #[test]
    fn saving_a_new_task_inserts_and_closes() {
        let storage = Storage::open_in_memory().unwrap();
        let mut state = TaskEditDialogState::default();
        state.create_a_new_task();
        for c in "walk the dog".chars() {
            state.input(c);
        }

        assert!(state.save_task(&storage));
        assert!(!state.dialog_active);

        let tasks = storage.get_tasks(&TaskView::default());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "walk the dog");
        assert!(!tasks[0].done);
    }

    #[test]
    fn editing_updates_in_place_without_touching_created_at() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage
            .add_task(&Task::new("old title".to_string(), String::new(), false))
            .unwrap();
        let original = storage.get_task_by_id(id).unwrap();

        let mut state = TaskEditDialogState::default();
        state.edit_task(&original);
        // Flip the done checkbox.
        state.move_cursor_down();
        state.move_cursor_down();
        state.input(' ');

        assert!(state.save_task(&storage));

        let updated = storage.get_task_by_id(id).unwrap();
        assert!(updated.done);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(count(&storage), 1);
    }

    #[test]
    fn cyrillic_input_edits_at_char_positions() {
        let mut state = TaskEditDialogState::default();
        state.create_a_new_task();
        for c in "пример".chars() {
            state.input(c);
        }
        assert_eq!(state.cursor_position, (6, 0));

        // Insert mid-word, then backspace it away again.
        state.move_cursor_left();
        state.move_cursor_left();
        state.input('ё');
        state.delete_char();
        state.delete_char();

        let storage = Storage::open_in_memory().unwrap();
        assert!(state.save_task(&storage));
        let tasks = storage.get_tasks(&crate::app::models::TaskView::default());
        assert_eq!(tasks[0].title, "приер");
    }

    #[test]
    fn dialog_renders_with_the_cursor_on_a_multibyte_char() {
        let storage = Storage::open_in_memory().unwrap();
        let mut app = crate::app::ui::App::new(&storage);
        app.task_edit_dialog_state.create_a_new_task();
        for c in "задача".chars() {
            app.task_edit_dialog_state.input(c);
        }
        app.task_edit_dialog_state.move_cursor_left();
        app.task_edit_dialog_state.move_cursor_left();

        let lines = get_task_edit_ui(&app);
        let title_line: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(title_line.contains("задача"));
    }

    #[test]
    fn cursor_stays_inside_the_field_contents() {
        let mut state = TaskEditDialogState::default();
        state.create_a_new_task();
        for c in "abc".chars() {
            state.input(c);
        }

        state.move_cursor_right();
        state.move_cursor_down();
        // Description is empty, so the column clamps to 0.
        assert_eq!(state.cursor_position, (0, 1));

        state.delete_char();
        assert_eq!(state.cursor_position, (0, 1));
    }
}
