use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{prelude::*, widgets::*};
use std::{
    io,
    time::{Duration, Instant},
};

use crate::app::storage::Storage;
use crate::app::{task_edit::*, task_list::*};

use super::models::TaskView;

// The list screen. The current filter/sort/search lives in `view`; every
// change to it builds a new value and reloads the list from storage.
pub struct App<'a> {
    pub items: TaskList<'a>,
    pub view: TaskView,
    pub task_edit_dialog_state: TaskEditDialogState,
    pub search_input: Option<String>,
    pub confirm_delete: bool,
    pub notice: Option<String>,
    pub storage: &'a Storage,
}

impl<'a> App<'a> {
    pub fn new(storage: &Storage) -> App {
        let view = TaskView::default();
        App {
            items: TaskList::with_items_from_storage(storage, &view),
            view,
            task_edit_dialog_state: TaskEditDialogState::default(),
            search_input: None,
            confirm_delete: false,
            notice: None,
            storage,
        }
    }

    fn set_view(&mut self, view: TaskView) {
        self.view = view;
        self.items.reload(&self.view);
    }
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    let last_tick = Instant::now();
    loop {
        terminal.draw(|f| draw_ui(f, &mut app))?;
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.task_edit_dialog_state.dialog_active {
                    handle_dialog_key(&mut app, key.code);
                } else if app.search_input.is_some() {
                    handle_search_key(&mut app, key.code);
                } else if app.confirm_delete {
                    handle_confirm_key(&mut app, key.code);
                } else if handle_list_key(&mut app, key.code) {
                    return Ok(());
                }
            }
        }
    }
}

fn handle_dialog_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Down => app.task_edit_dialog_state.move_cursor_down(),
        KeyCode::Up => app.task_edit_dialog_state.move_cursor_up(),
        KeyCode::Esc => app.task_edit_dialog_state.close(),
        KeyCode::Enter => {
            if app.task_edit_dialog_state.save_task(app.storage) {
                app.items.reload(&app.view);
            }
        }
        KeyCode::Left => app.task_edit_dialog_state.move_cursor_left(),
        KeyCode::Right => app.task_edit_dialog_state.move_cursor_right(),
        KeyCode::Backspace => app.task_edit_dialog_state.delete_char(),
        KeyCode::Char(to_insert) => app.task_edit_dialog_state.input(to_insert),
        _ => {}
    }
}

fn handle_search_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.search_input = None,
        KeyCode::Enter => {
            let text = app.search_input.take();
            let view = app.view.with_search(text);
            app.set_view(view);
        }
        KeyCode::Backspace => {
            if let Some(ref mut input) = app.search_input {
                input.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(ref mut input) = app.search_input {
                input.push(c);
            }
        }
        _ => {}
    }
}

// The delete prompt: y confirms, any other key cancels.
fn handle_confirm_key(app: &mut App, code: KeyCode) {
    app.confirm_delete = false;
    if matches!(code, KeyCode::Char('y') | KeyCode::Char('Y')) {
        if app.items.delete_selected() {
            app.items.reload(&app.view);
        } else {
            app.notice = Some("Could not delete the task".to_string());
        }
    }
}

// Returns true when the app should quit.
fn handle_list_key(app: &mut App, code: KeyCode) -> bool {
    app.notice = None;
    match code {
        KeyCode::Char('q') => return true,
        KeyCode::Down => app.items.next(),
        KeyCode::Up => app.items.previous(),
        KeyCode::Left => app.items.unselect(),
        KeyCode::Enter => {
            if app.items.toggle_completed() == Some(false) {
                app.notice = Some("Could not update the task status".to_string());
            }
        }
        KeyCode::Char('a') => app.task_edit_dialog_state.create_a_new_task(),
        KeyCode::Char('e') => {
            // Re-read the record so the dialog edits what is stored, not a
            // possibly stale row.
            if let Some(id) = app.items.get_selected().and_then(|task| task.id) {
                match app.storage.get_task_by_id(id) {
                    Some(task) => app.task_edit_dialog_state.edit_task(&task),
                    None => app.notice = Some("Task not found".to_string()),
                }
            }
        }
        KeyCode::Char('x') => {
            if app.items.get_selected().is_some() {
                app.confirm_delete = true;
            }
        }
        KeyCode::Char('/') => {
            app.search_input = Some(app.view.search.clone().unwrap_or_default());
        }
        KeyCode::Char('c') => {
            let view = app.view.toggled_completed_first();
            app.set_view(view);
        }
        KeyCode::Char('n') => {
            let view = app.view.toggled_newest_first();
            app.set_view(view);
        }
        _ => {}
    }
    false
}

// Draws the whole user interface
fn draw_ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(f.size());

    // Main area in a 60-40 split: task list left, dialog or infoboxes right
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[0]);

    let task_list = List::new(get_list_items_ui(app.items.items.as_slice()))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(list_title(app)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(task_list, chunks[0], &mut app.items.state);

    if app.task_edit_dialog_state.dialog_active {
        let create_or_edit_task = Paragraph::new(get_task_edit_ui(app))
            .block(Block::new().title("Add/Edit Task").borders(Borders::ALL))
            .style(Style::new().white());

        f.render_widget(create_or_edit_task, chunks[1]);
    } else {
        let right_side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let instructions = Paragraph::new(get_instructions_ui())
            .block(Block::new().title("Commands").borders(Borders::ALL))
            .style(Style::new().white());

        let statistics = Paragraph::new(get_statistics_ui(app))
            .block(Block::new().title("Statistics").borders(Borders::ALL))
            .style(Style::new().white());

        f.render_widget(instructions, right_side[0]);
        f.render_widget(statistics, right_side[1]);
    }

    f.render_widget(status_line(app), rows[1]);
}

fn list_title(app: &App) -> String {
    match app.view.search {
        Some(ref search) => format!("Tasks (search: {search})"),
        None => "Tasks".to_string(),
    }
}

// Bottom line: the search prompt while typing, the delete prompt while
// confirming, otherwise the latest notice.
fn status_line<'a>(app: &'a App<'a>) -> Paragraph<'a> {
    let line = if app.confirm_delete {
        let title = app.items.get_selected().map_or("", |task| task.title.as_str());
        Line::from(Span::styled(
            format!("Delete \"{title}\"? y/n"),
            Style::new().fg(Color::Yellow),
        ))
    } else if let Some(ref input) = app.search_input {
        Line::from(vec![
            Span::from("Search: "),
            Span::from(input.as_str()),
            Span::styled(" ", Style::new().fg(Color::Black).bg(Color::White)),
            Span::styled("  (Enter - apply, Esc - cancel)", Style::new().dark_gray()),
        ])
    } else if let Some(ref notice) = app.notice {
        Line::from(Span::styled(notice.as_str(), Style::new().fg(Color::Red)))
    } else {
        Line::raw("")
    };
    Paragraph::new(line)
}

// Build the UI (lines) for statistics infobox
pub fn get_statistics_ui<'a>(app: &'a App<'a>) -> Vec<Line<'a>> {
    vec![
        Line::from(format!("Total tasks: {}", app.items.items.len())),
        Line::from(format!("Open: {}", app.items.count_open())),
        Line::from(format!("Done: {}", app.items.count_done())),
        Line::from(""),
        Line::from(format!(
            "Sort: {}, {}",
            if app.view.completed_first {
                "done first"
            } else {
                "open first"
            },
            if app.view.newest_first {
                "newest first"
            } else {
                "oldest first"
            },
        )),
    ]
}

// Build the UI (lines) for instructions infobox
pub fn get_instructions_ui<'a>() -> Vec<Line<'a>> {
    vec![
        "Enter - toggle do/done".into(),
        "a - add a task".into(),
        "e - edit a task".into(),
        "x - delete a task".into(),
        "/ - search".into(),
        "c - toggle done-first sort".into(),
        "n - toggle newest-first sort".into(),
        "q - quit".into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::Task;

    fn storage_with_one_task() -> Storage {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .add_task(&Task::new("doomed".to_string(), String::new(), false))
            .unwrap();
        storage
    }

    #[test]
    fn delete_waits_for_confirmation() {
        let storage = storage_with_one_task();
        let mut app = App::new(&storage);
        app.items.next();

        handle_list_key(&mut app, KeyCode::Char('x'));
        assert!(app.confirm_delete);
        assert_eq!(app.items.items.len(), 1);

        // Any key but y cancels.
        handle_confirm_key(&mut app, KeyCode::Char('n'));
        assert!(!app.confirm_delete);
        assert_eq!(app.items.items.len(), 1);

        handle_list_key(&mut app, KeyCode::Char('x'));
        handle_confirm_key(&mut app, KeyCode::Char('y'));
        assert!(!app.confirm_delete);
        assert!(app.items.items.is_empty());
        assert!(storage.get_tasks(&TaskView::default()).is_empty());
    }

    #[test]
    fn delete_prompt_needs_a_selection() {
        let storage = storage_with_one_task();
        let mut app = App::new(&storage);

        handle_list_key(&mut app, KeyCode::Char('x'));
        assert!(!app.confirm_delete);
        assert_eq!(app.items.items.len(), 1);
    }
}
