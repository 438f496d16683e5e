//! Application model: view routing, key dispatch, and the composition of
//! catalog, surface, session, and page rendering.
//!
//! `App::handle_event` is a pure-ish state transition: it mutates the model
//! and returns the side effects the runtime loop must perform (spawn an
//! execution task, trigger the highlight load, quit). Keeping the loop's
//! I/O out of here is what makes the whole interaction model testable with
//! scripted events.

use core_catalog::{Catalog, Exercise};
use core_events::{
    EXEC_RESPONSES_DISCARDED, Event, ExecCompletion, HighlightEvent, InputEvent, KeyCode,
    KeyEvent,
};
use core_render::views::{ExerciseModel, IndexModel, draw_exercise, draw_index};
use core_render::Frame;
use core_session::{Baseline, ExecutionSession, LanguageTarget, RunTicket};
use core_surface::{EditableSurface, SurfaceMetrics};
use std::sync::atomic::Ordering;
use tracing::{debug, info};

const RUN_KEY: KeyCode = KeyCode::F(5);
const RESET_KEY: KeyCode = KeyCode::F(6);

/// Side effects the runtime loop performs on behalf of the model.
#[derive(Debug)]
pub enum Effect {
    /// Spawn one execution round-trip for this ticket.
    SpawnRun(RunTicket),
    /// Trigger the one-time highlight grammar load.
    EnsureHighlight,
    Quit,
}

/// What one event did to the model.
#[derive(Debug, Default)]
pub struct Update {
    pub effects: Vec<Effect>,
    pub repaint: bool,
}

impl Update {
    fn repaint() -> Self {
        Self {
            effects: Vec::new(),
            repaint: true,
        }
    }

    fn none() -> Self {
        Self::default()
    }

    fn with(effect: Effect) -> Self {
        Self {
            effects: vec![effect],
            repaint: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Page,
    Editor,
}

pub struct IndexView {
    pub page: usize,
    pub selected: usize,
}

pub struct ExerciseView {
    pub exercise_id: u32,
    pub surface: EditableSurface,
    pub session: ExecutionSession,
    pub focus: Focus,
    pub scroll: u16,
}

impl ExerciseView {
    fn new(exercise: &Exercise, target: LanguageTarget) -> Self {
        let session = ExecutionSession::new(
            Baseline {
                code: exercise.code.clone(),
                expected_output: exercise.expected_output.clone(),
            },
            target,
        );
        Self {
            exercise_id: exercise.id,
            surface: EditableSurface::new(&exercise.code, SurfaceMetrics::default()),
            session,
            focus: Focus::Page,
            scroll: 0,
        }
    }
}

pub enum View {
    Index(IndexView),
    Exercise(ExerciseView),
}

pub struct App {
    catalog: Catalog,
    target: LanguageTarget,
    per_page: usize,
    heading: String,
    subheading: String,
    view: View,
    term: (u16, u16),
    spinner_phase: usize,
    highlight_requested: bool,
}

impl App {
    pub fn new(
        catalog: Catalog,
        target: LanguageTarget,
        per_page: usize,
        term: (u16, u16),
    ) -> Self {
        Self {
            catalog,
            target,
            per_page: per_page.max(1),
            heading: "Practical Record".to_string(),
            subheading: "Python Programming Lab".to_string(),
            view: View::Index(IndexView {
                page: 1,
                selected: 0,
            }),
            term,
            spinner_phase: 0,
            highlight_requested: false,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Current exercise view, when one is open (test and render access).
    pub fn exercise_view(&self) -> Option<&ExerciseView> {
        match &self.view {
            View::Exercise(v) => Some(v),
            View::Index(_) => None,
        }
    }

    /// Open an exercise directly (CLI `--exercise`, index selection).
    /// Unknown ids leave the view unchanged.
    pub fn open(&mut self, id: u32) -> Update {
        self.open_exercise(id)
    }

    pub fn handle_event(&mut self, event: Event) -> Update {
        match event {
            Event::Input(InputEvent::CtrlC) => Update::with(Effect::Quit),
            Event::Input(InputEvent::Resize(w, h)) => {
                self.term = (w, h);
                Update::repaint()
            }
            Event::Input(InputEvent::Key(key)) => self.handle_key(key),
            Event::Exec(completion) => self.handle_completion(completion),
            Event::Highlight(HighlightEvent::Ready) => {
                info!(target: "runtime", "highlight_ready");
                Update::repaint()
            }
            Event::Highlight(HighlightEvent::Failed) => {
                // The provider already degraded itself; the page simply
                // keeps its plain rendering.
                Update::repaint()
            }
            Event::Tick => {
                let running = matches!(
                    &self.view,
                    View::Exercise(v) if v.session.is_running()
                );
                if running {
                    self.spinner_phase = self.spinner_phase.wrapping_add(1);
                    Update::repaint()
                } else {
                    Update::none()
                }
            }
            Event::Shutdown => Update::with(Effect::Quit),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Update {
        match &mut self.view {
            View::Index(_) => self.handle_index_key(key),
            View::Exercise(v) => match v.focus {
                Focus::Editor => Self::handle_editor_key(v, key),
                Focus::Page => self.handle_page_key(key),
            },
        }
    }

    fn handle_index_key(&mut self, key: KeyEvent) -> Update {
        let total_pages = self.catalog.total_index_pages(self.per_page);
        let View::Index(index) = &mut self.view else {
            return Update::none();
        };
        let visible = self
            .catalog
            .page_slice(index.page, self.per_page)
            .len();
        match key.code {
            KeyCode::Up => {
                index.selected = index.selected.saturating_sub(1);
                Update::repaint()
            }
            KeyCode::Down => {
                if index.selected + 1 < visible {
                    index.selected += 1;
                }
                Update::repaint()
            }
            KeyCode::Home => {
                index.selected = 0;
                Update::repaint()
            }
            KeyCode::End => {
                index.selected = visible.saturating_sub(1);
                Update::repaint()
            }
            KeyCode::Left | KeyCode::PageUp => {
                if index.page > 1 {
                    index.page -= 1;
                    index.selected = 0;
                }
                Update::repaint()
            }
            KeyCode::Right | KeyCode::PageDown => {
                if index.page < total_pages {
                    index.page += 1;
                    index.selected = 0;
                    Update::repaint()
                } else {
                    // Walking past the last index page opens the first
                    // exercise, like the printed record's reading order.
                    let first = self.catalog.first().id;
                    self.open_exercise(first)
                }
            }
            KeyCode::Enter => {
                let slice = self.catalog.page_slice(index.page, self.per_page);
                match slice.get(index.selected) {
                    Some(exercise) => {
                        let id = exercise.id;
                        self.open_exercise(id)
                    }
                    None => Update::none(),
                }
            }
            _ => Update::none(),
        }
    }

    fn handle_page_key(&mut self, key: KeyEvent) -> Update {
        match key.code {
            KeyCode::Esc => {
                self.back_to_index();
                Update::repaint()
            }
            KeyCode::Char('i') => {
                if let View::Exercise(v) = &mut self.view {
                    v.focus = Focus::Editor;
                }
                Update::repaint()
            }
            KeyCode::Left => self.navigate_neighbor(false),
            KeyCode::Right => self.navigate_neighbor(true),
            KeyCode::Home => {
                let id = self.catalog.first().id;
                self.open_exercise(id)
            }
            KeyCode::End => {
                let id = self.catalog.last().id;
                self.open_exercise(id)
            }
            KeyCode::Up => self.scroll_by(-1),
            KeyCode::Down => self.scroll_by(1),
            KeyCode::PageUp => self.scroll_by(-10),
            KeyCode::PageDown => self.scroll_by(10),
            code if code == RUN_KEY => self.trigger_run(),
            code if code == RESET_KEY => self.trigger_reset(),
            _ => Update::none(),
        }
    }

    fn handle_editor_key(v: &mut ExerciseView, key: KeyEvent) -> Update {
        match key.code {
            KeyCode::Esc => {
                v.focus = Focus::Page;
                Update::repaint()
            }
            code if code == RUN_KEY => Self::run_in(v),
            code if code == RESET_KEY => Self::reset_in(v),
            _ => {
                let report = v.surface.handle_key(key);
                if report.changed {
                    v.session.note_edit();
                }
                if report.changed || report.caret_moved {
                    Update::repaint()
                } else {
                    Update::none()
                }
            }
        }
    }

    fn trigger_run(&mut self) -> Update {
        match &mut self.view {
            View::Exercise(v) => Self::run_in(v),
            View::Index(_) => Update::none(),
        }
    }

    fn run_in(v: &mut ExerciseView) -> Update {
        match v.session.begin_run(&v.surface.text()) {
            Some(ticket) => {
                info!(target: "exec", ticket = %ticket.id, exercise = v.exercise_id, "run_started");
                Update::with(Effect::SpawnRun(ticket))
            }
            None => {
                debug!(target: "exec", exercise = v.exercise_id, "run_refused_already_running");
                Update::none()
            }
        }
    }

    fn trigger_reset(&mut self) -> Update {
        match &mut self.view {
            View::Exercise(v) => Self::reset_in(v),
            View::Index(_) => Update::none(),
        }
    }

    fn reset_in(v: &mut ExerciseView) -> Update {
        match v.session.reset() {
            Some(baseline) => {
                let code = baseline.code.clone();
                v.surface.reset_text(&code);
                Update::repaint()
            }
            None => {
                debug!(target: "exec", exercise = v.exercise_id, "reset_refused_while_running");
                Update::none()
            }
        }
    }

    fn handle_completion(&mut self, completion: ExecCompletion) -> Update {
        match &mut self.view {
            View::Exercise(v) => {
                v.session.complete_run(completion);
                Update::repaint()
            }
            View::Index(_) => {
                EXEC_RESPONSES_DISCARDED.fetch_add(1, Ordering::Relaxed);
                debug!(target: "exec", ticket = %completion.ticket, "completion_after_leaving_exercise");
                Update::none()
            }
        }
    }

    /// Switch to an exercise: fresh surface and fresh session, no state
    /// carried over. Any in-flight run keeps its old ticket and will be
    /// discarded on arrival.
    fn open_exercise(&mut self, id: u32) -> Update {
        let Some(exercise) = self.catalog.get(id) else {
            return Update::none();
        };
        self.view = View::Exercise(ExerciseView::new(exercise, self.target.clone()));
        info!(target: "runtime", exercise = id, "exercise_opened");
        if self.highlight_requested {
            Update::repaint()
        } else {
            self.highlight_requested = true;
            Update::with(Effect::EnsureHighlight)
        }
    }

    fn back_to_index(&mut self) {
        let page = match &self.view {
            View::Exercise(v) => {
                self.catalog
                    .position(v.exercise_id)
                    .map_or(1, |pos| pos / self.per_page + 1)
            }
            View::Index(i) => i.page,
        };
        self.view = View::Index(IndexView { page, selected: 0 });
    }

    fn navigate_neighbor(&mut self, forward: bool) -> Update {
        let id = match &self.view {
            View::Exercise(v) => v.exercise_id,
            View::Index(_) => return Update::none(),
        };
        let (prev, next) = self.catalog.neighbors(id);
        let target = if forward { next } else { prev };
        match target {
            Some(exercise) => {
                let id = exercise.id;
                self.open_exercise(id)
            }
            None => Update::none(),
        }
    }

    fn scroll_by(&mut self, delta: i32) -> Update {
        if let View::Exercise(v) = &mut self.view {
            let next = v.scroll as i32 + delta;
            v.scroll = next.clamp(0, u16::MAX as i32) as u16;
            Update::repaint()
        } else {
            Update::none()
        }
    }

    /// Compose the current view into a terminal-sized frame. Scroll is
    /// clamped against the rendered document height here, where it is
    /// known.
    pub fn render(&mut self) -> Frame {
        let (w, h) = self.term;
        match &mut self.view {
            View::Index(index) => {
                let entries = self.catalog.page_slice(index.page, self.per_page);
                let model = IndexModel {
                    heading: &self.heading,
                    subheading: &self.subheading,
                    entries,
                    start_serial: self.catalog.page_start_serial(index.page, self.per_page),
                    selected: index.selected,
                    page: index.page,
                    total_pages: self.catalog.total_index_pages(self.per_page),
                    per_page: self.per_page,
                };
                let (doc, selected_row) = draw_index(&model, w);
                // Keep the selection bar visible on short terminals.
                let top = selected_row.saturating_sub(h.saturating_sub(1));
                doc.window(top, h)
            }
            View::Exercise(v) => {
                // Exercise views are only ever constructed from catalog
                // lookups; a missing id here means the model was corrupted,
                // so paint nothing rather than panic mid-frame.
                let Some(exercise) = self.catalog.get(v.exercise_id) else {
                    return Frame::new(w, h);
                };
                let (prev, next) = self.catalog.neighbors(v.exercise_id);
                let model = ExerciseModel {
                    exercise,
                    surface: &v.surface,
                    output: v.session.output(),
                    stale: v.session.is_stale(),
                    running: v.session.is_running(),
                    editor_focused: v.focus == Focus::Editor,
                    spinner_phase: self.spinner_phase,
                    page_number: self.catalog.doc_page_number(v.exercise_id, self.per_page),
                    total_pages: self.catalog.doc_total_pages(self.per_page),
                    prev_title: prev.map(|e| e.title.as_str()),
                    next_title: next.map(|e| e.title.as_str()),
                };
                let doc = draw_exercise(&model, w);
                let max_scroll = doc.height.saturating_sub(h);
                if v.scroll > max_scroll {
                    v.scroll = max_scroll;
                }
                doc.window(v.scroll, h)
            }
        }
    }
}
